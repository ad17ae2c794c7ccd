use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Signature, Signer};
use sss_sdk::amount::{format_amount, parse_amount};
use sss_sdk::config::{
    load_solana_cli_config, load_sss_config, parse_pubkey, resolve_network, ClusterInfo,
    ExtensionsConfig, SssConfig, TokenConfig,
};
use sss_sdk::instructions::recipient_token_account;
use sss_sdk::pda::find_config_pda;
use sss_sdk::{
    BlacklistParams, FreezeParams, InitializeParams, MintToParams, SeizeParams, StablecoinClient,
    UpdateAuthorityParams,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sss-token", version, about = "Solana Stablecoin Standard CLI")]
struct Cli {
    #[arg(long)]
    cluster: Option<String>,

    #[arg(long)]
    keypair: Option<String>,

    /// TOML file with `[token]`, `[extensions]`, `[network]` and `[client]` tables.
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long)]
    program_id: Option<String>,

    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    Init(InitArgs),
    Mint(MintArgs),
    /// Freeze a token account.
    Freeze(AddressArgs),
    /// Thaw a token account.
    Thaw(AddressArgs),
    Blacklist(BlacklistArgs),
    Seize(SeizeArgs),
    Authority(AuthorityArgs),
    Status(MintOnlyArgs),
    Balance(BalanceArgs),
}

#[derive(Parser)]
struct InitArgs {
    #[arg(long)]
    preset: Option<String>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    symbol: Option<String>,

    #[arg(long, default_value_t = 6)]
    decimals: u8,

    #[arg(long)]
    uri: Option<String>,

    /// Defaults to the signing keypair.
    #[arg(long)]
    mint_authority: Option<String>,

    /// Defaults to the signing keypair.
    #[arg(long)]
    freeze_authority: Option<String>,

    #[arg(long)]
    transfer_hook_program: Option<String>,
}

#[derive(Parser)]
struct MintArgs {
    recipient: String,
    amount: String,

    #[arg(long)]
    mint: Option<String>,
}

#[derive(Parser)]
struct AddressArgs {
    address: String,

    #[arg(long)]
    mint: Option<String>,
}

#[derive(Parser)]
struct BlacklistArgs {
    #[command(subcommand)]
    command: BlacklistCmd,
}

#[derive(Subcommand)]
enum BlacklistCmd {
    Add(AddressArgs),
    Remove(AddressArgs),
    Check(CheckArgs),
}

#[derive(Parser)]
struct CheckArgs {
    address: String,
}

#[derive(Parser)]
struct SeizeArgs {
    /// Source token account.
    address: String,

    /// Destination token account.
    #[arg(long)]
    to: String,

    /// Defaults to the full balance of the source account.
    #[arg(long)]
    amount: Option<String>,

    #[arg(long)]
    mint: Option<String>,
}

#[derive(Parser)]
struct AuthorityArgs {
    #[command(subcommand)]
    command: AuthorityCmd,
}

#[derive(Subcommand)]
enum AuthorityCmd {
    SetMinter(AddressArgs),
    SetFreezer(AddressArgs),
}

#[derive(Parser)]
struct MintOnlyArgs {
    #[arg(long)]
    mint: Option<String>,
}

#[derive(Parser)]
struct BalanceArgs {
    owner: String,

    #[arg(long)]
    mint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let config_file = cli
        .config
        .as_deref()
        .map(load_sss_config)
        .transpose()?;
    let ctx = build_context(&cli, config_file.as_ref())?;

    match &cli.command {
        Commands::Init(args) => handle_init(&ctx, args, config_file.as_ref()).await,
        Commands::Mint(args) => handle_mint(&ctx, args).await,
        Commands::Freeze(args) => handle_freeze(&ctx, args, true).await,
        Commands::Thaw(args) => handle_freeze(&ctx, args, false).await,
        Commands::Blacklist(args) => handle_blacklist(&ctx, &args.command).await,
        Commands::Seize(args) => handle_seize(&ctx, args).await,
        Commands::Authority(args) => handle_authority(&ctx, &args.command).await,
        Commands::Status(args) => handle_status(&ctx, args).await,
        Commands::Balance(args) => handle_balance(&ctx, args).await,
    }
}

struct Context {
    client: StablecoinClient,
    output: OutputFormat,
    cluster: ClusterInfo,
}

fn build_context(cli: &Cli, config_file: Option<&SssConfig>) -> Result<Context> {
    let solana_config = load_solana_cli_config().ok();
    let network = resolve_network(
        cli.cluster.as_deref(),
        cli.keypair.as_deref(),
        config_file.and_then(|cfg| cfg.network.as_ref()),
        solana_config.as_ref(),
    )?;

    let payer = read_keypair_file(&network.keypair_path)
        .map_err(|err| anyhow!("Failed to read keypair: {}", err))?;

    let client_config = config_file
        .and_then(|cfg| cfg.client.clone())
        .unwrap_or_default();
    let program_id = match cli.program_id.as_deref() {
        Some(value) => parse_pubkey(value)?,
        None => client_config.program_id()?,
    };
    tracing::debug!(
        "using {} with program {} at {:?}",
        network.cluster.url,
        program_id,
        network.commitment.commitment
    );

    let client = StablecoinClient::from_rpc_url(
        network.cluster.url.clone(),
        network.commitment,
        program_id,
        payer,
        client_config.submit_options(),
    );

    Ok(Context {
        client,
        output: cli.output,
        cluster: network.cluster,
    })
}

fn init_params(
    args: &InitArgs,
    config: Option<&SssConfig>,
    signer: &Pubkey,
) -> Result<InitializeParams> {
    let from_file = config.and_then(|cfg| cfg.token.clone());
    if args.preset.is_some() && from_file.is_some() {
        return Err(anyhow!("--preset and a [token] table are mutually exclusive"));
    }

    let (token, extensions) = if let Some(token) = from_file {
        let extensions = config
            .and_then(|cfg| cfg.extensions.clone())
            .unwrap_or_default();
        (token, extensions)
    } else {
        let preset = args
            .preset
            .as_deref()
            .ok_or_else(|| anyhow!("Missing --preset or --config"))?;
        let name = args
            .name
            .clone()
            .ok_or_else(|| anyhow!("--name is required when using --preset"))?;
        let symbol = args
            .symbol
            .clone()
            .ok_or_else(|| anyhow!("--symbol is required when using --preset"))?;
        let token = TokenConfig {
            name,
            symbol,
            decimals: Some(args.decimals),
            uri: args.uri.clone(),
        };
        (token, ExtensionsConfig::from_preset(preset)?)
    };

    let enable_transfer_hook = extensions.transfer_hook.unwrap_or(false);
    let transfer_hook_program = args
        .transfer_hook_program
        .as_deref()
        .or(extensions.transfer_hook_program.as_deref())
        .map(parse_pubkey)
        .transpose()?;
    if enable_transfer_hook && transfer_hook_program.is_none() {
        return Err(anyhow!(
            "Transfer hook is enabled: pass --transfer-hook-program or set \
             [extensions].transfer_hook_program"
        ));
    }

    let params = InitializeParams {
        name: token.name,
        symbol: token.symbol,
        uri: token.uri.unwrap_or_default(),
        decimals: token.decimals.unwrap_or(6),
        enable_permanent_delegate: extensions.permanent_delegate.unwrap_or(false),
        enable_transfer_hook,
        default_account_frozen: extensions.default_account_frozen.unwrap_or(false),
        transfer_hook_program,
        mint_authority: optional_pubkey(&args.mint_authority, signer)?,
        freeze_authority: optional_pubkey(&args.freeze_authority, signer)?,
    };
    params.validate()?;
    Ok(params)
}

async fn handle_init(ctx: &Context, args: &InitArgs, config: Option<&SssConfig>) -> Result<()> {
    let authority = ctx.client.payer();
    let params = init_params(args, config, &authority.pubkey())?;
    let preset_label = preset_label(params.enable_transfer_hook);

    let initialized = ctx.client.initialize(params, authority).await?;
    let signature = initialized.signature.to_string();
    let explorer = ctx.cluster.explorer_url(&signature);

    if ctx.output == OutputFormat::Json {
        let output = InitOutput {
            mint: initialized.mint.to_string(),
            config: initialized.config.to_string(),
            preset: preset_label.to_string(),
            signature,
            explorer,
        };
        print_json(&output)
    } else {
        println!("Stablecoin initialized");
        println!("Mint:     {}", initialized.mint);
        println!("Config:   {}", initialized.config);
        println!("Preset:   {}", preset_label);
        println!("Tx:       {}", signature);
        if let Some(url) = explorer {
            println!("Explorer: {}", url);
        }
        Ok(())
    }
}

async fn handle_mint(ctx: &Context, args: &MintArgs) -> Result<()> {
    let mint = resolve_mint(&args.mint)?;
    let config = ctx.client.get_config(&mint).await?;
    let amount = parse_amount(&args.amount, config.decimals)?;
    let recipient = parse_pubkey(&args.recipient)?;

    let signature = ctx
        .client
        .mint_to(
            MintToParams {
                mint,
                recipient,
                amount,
            },
            ctx.client.payer(),
        )
        .await?;
    let balance = ctx.client.get_token_balance(&mint, &recipient).await;

    let signature = signature.to_string();
    let explorer = ctx.cluster.explorer_url(&signature);
    if ctx.output == OutputFormat::Json {
        let output = MintOutput {
            signature,
            explorer,
            recipient_balance: balance,
        };
        print_json(&output)
    } else {
        println!(
            "Minted {} tokens to {}",
            format_amount(amount, config.decimals),
            recipient
        );
        println!(
            "Recipient balance: {}",
            format_amount(balance, config.decimals)
        );
        print_signature(&signature, explorer);
        Ok(())
    }
}

async fn handle_freeze(ctx: &Context, args: &AddressArgs, freeze: bool) -> Result<()> {
    let mint = resolve_mint(&args.mint)?;
    let account = parse_pubkey(&args.address)?;
    let params = FreezeParams { mint, account };
    let authority = ctx.client.payer();

    let signature = if freeze {
        ctx.client.freeze_account(params, authority).await?
    } else {
        ctx.client.thaw_account(params, authority).await?
    };
    let verb = if freeze { "Frozen" } else { "Thawed" };
    report(ctx, signature, &format!("{} token account: {}", verb, account))
}

async fn handle_blacklist(ctx: &Context, cmd: &BlacklistCmd) -> Result<()> {
    let authority = ctx.client.payer();
    match cmd {
        BlacklistCmd::Add(args) => {
            let mint = resolve_mint(&args.mint)?;
            let target = parse_pubkey(&args.address)?;
            let signature = ctx
                .client
                .add_to_blacklist(BlacklistParams { mint, target }, authority)
                .await?;
            report(ctx, signature, &format!("Blacklisted: {}", target))
        }
        BlacklistCmd::Remove(args) => {
            let mint = resolve_mint(&args.mint)?;
            let target = parse_pubkey(&args.address)?;
            let signature = ctx
                .client
                .remove_from_blacklist(BlacklistParams { mint, target }, authority)
                .await?;
            report(ctx, signature, &format!("Removed from blacklist: {}", target))
        }
        BlacklistCmd::Check(args) => {
            let wallet = parse_pubkey(&args.address)?;
            let entry = ctx.client.blacklist_entry(&wallet).await?;
            let is_blacklisted = entry
                .as_ref()
                .map(|entry| entry.is_blacklisted)
                .unwrap_or(false);
            if ctx.output == OutputFormat::Json {
                let output = BlacklistStatusOutput {
                    wallet: wallet.to_string(),
                    is_blacklisted,
                    updated_at: entry.map(|entry| entry.timestamp),
                };
                print_json(&output)
            } else {
                if is_blacklisted {
                    println!("Blacklisted: {}", wallet);
                } else {
                    println!("Not blacklisted: {}", wallet);
                }
                Ok(())
            }
        }
    }
}

async fn handle_seize(ctx: &Context, args: &SeizeArgs) -> Result<()> {
    let mint = resolve_mint(&args.mint)?;
    let config = ctx.client.get_config(&mint).await?;
    if !config.enable_permanent_delegate {
        return Err(anyhow!(
            "Permanent delegate not enabled for this stablecoin"
        ));
    }
    let from = parse_pubkey(&args.address)?;
    let to = parse_pubkey(&args.to)?;
    let source = ctx.client.token_account(&from).await?;
    if source.mint != mint {
        return Err(anyhow!("Target token account mint does not match"));
    }
    let amount = match args.amount.as_deref() {
        Some(value) => parse_amount(value, config.decimals)?,
        None => source.amount,
    };
    if amount == 0 {
        return Err(anyhow!("Nothing to seize from {}", from));
    }

    let signature = ctx
        .client
        .seize(
            SeizeParams {
                mint,
                from,
                to,
                amount,
            },
            ctx.client.payer(),
        )
        .await?;
    report(
        ctx,
        signature,
        &format!(
            "Seized {} tokens from {}",
            format_amount(amount, config.decimals),
            from
        ),
    )
}

async fn handle_authority(ctx: &Context, cmd: &AuthorityCmd) -> Result<()> {
    let authority = ctx.client.payer();
    let (args, role) = match cmd {
        AuthorityCmd::SetMinter(args) => (args, "Mint"),
        AuthorityCmd::SetFreezer(args) => (args, "Freeze"),
    };
    let params = UpdateAuthorityParams {
        mint: resolve_mint(&args.mint)?,
        new_authority: parse_pubkey(&args.address)?,
    };
    let signature = match cmd {
        AuthorityCmd::SetMinter(_) => ctx.client.update_mint_authority(params, authority).await?,
        AuthorityCmd::SetFreezer(_) => ctx.client.update_freeze_authority(params, authority).await?,
    };
    report(
        ctx,
        signature,
        &format!("{} authority set to {}", role, params.new_authority),
    )
}

async fn handle_status(ctx: &Context, args: &MintOnlyArgs) -> Result<()> {
    let mint = resolve_mint(&args.mint)?;
    let config_address = find_config_pda(&mint, ctx.client.program_id())?.address;
    let config = ctx.client.get_config(&mint).await?;
    let preset = preset_label(config.enable_transfer_hook);

    if ctx.output == OutputFormat::Json {
        let output = StatusOutput {
            mint: mint.to_string(),
            config: config_address.to_string(),
            preset: preset.to_string(),
            name: config.name,
            symbol: config.symbol,
            uri: config.uri,
            decimals: config.decimals,
            mint_authority: config.mint_authority.to_string(),
            freeze_authority: config.freeze_authority.to_string(),
            features: FeatureOutput {
                permanent_delegate: config.enable_permanent_delegate,
                transfer_hook: config.enable_transfer_hook,
                default_frozen: config.default_account_frozen,
            },
        };
        print_json(&output)
    } else {
        println!("Stablecoin status");
        println!("Mint: {}", mint);
        println!("Config: {}", config_address);
        println!("Preset: {}", preset);
        println!("Name: {} ({})", config.name, config.symbol);
        if !config.uri.is_empty() {
            println!("URI: {}", config.uri);
        }
        println!("Decimals: {}", config.decimals);
        println!("Mint authority: {}", config.mint_authority);
        println!("Freeze authority: {}", config.freeze_authority);
        println!("Features:");
        println!(
            "  Permanent delegate: {}",
            config.enable_permanent_delegate
        );
        println!("  Transfer hook: {}", config.enable_transfer_hook);
        println!("  Default frozen: {}", config.default_account_frozen);
        Ok(())
    }
}

async fn handle_balance(ctx: &Context, args: &BalanceArgs) -> Result<()> {
    let mint = resolve_mint(&args.mint)?;
    let owner = parse_pubkey(&args.owner)?;
    let config = ctx.client.get_config(&mint).await?;
    let amount = ctx.client.try_token_balance(&mint, &owner).await?;

    if ctx.output == OutputFormat::Json {
        let output = BalanceOutput {
            owner: owner.to_string(),
            token_account: recipient_token_account(&mint, &owner).to_string(),
            amount,
            ui_amount: format_amount(amount, config.decimals),
        };
        print_json(&output)
    } else {
        println!(
            "{}: {} {}",
            owner,
            format_amount(amount, config.decimals),
            config.symbol
        );
        Ok(())
    }
}

fn report(ctx: &Context, signature: Signature, message: &str) -> Result<()> {
    let signature = signature.to_string();
    let explorer = ctx.cluster.explorer_url(&signature);
    if ctx.output == OutputFormat::Json {
        let output = SimpleOutput {
            signature,
            explorer,
        };
        print_json(&output)
    } else {
        println!("{}", message);
        print_signature(&signature, explorer);
        Ok(())
    }
}

fn print_signature(signature: &str, explorer: Option<String>) {
    println!("Tx: {}", signature);
    if let Some(url) = explorer {
        println!("Explorer: {}", url);
    }
}

fn preset_label(transfer_hook: bool) -> &'static str {
    if transfer_hook {
        "SSS-2"
    } else {
        "SSS-1"
    }
}

fn resolve_mint(mint: &Option<String>) -> Result<Pubkey> {
    let value = mint.as_deref().ok_or_else(|| anyhow!("Missing --mint"))?;
    parse_pubkey(value)
}

fn optional_pubkey(value: &Option<String>, fallback: &Pubkey) -> Result<Pubkey> {
    match value.as_deref() {
        Some(value) => parse_pubkey(value),
        None => Ok(*fallback),
    }
}

#[derive(Serialize)]
struct InitOutput {
    mint: String,
    config: String,
    preset: String,
    signature: String,
    explorer: Option<String>,
}

#[derive(Serialize)]
struct MintOutput {
    signature: String,
    explorer: Option<String>,
    recipient_balance: u64,
}

#[derive(Serialize)]
struct SimpleOutput {
    signature: String,
    explorer: Option<String>,
}

#[derive(Serialize)]
struct BlacklistStatusOutput {
    wallet: String,
    is_blacklisted: bool,
    updated_at: Option<i64>,
}

#[derive(Serialize)]
struct StatusOutput {
    mint: String,
    config: String,
    preset: String,
    name: String,
    symbol: String,
    uri: String,
    decimals: u8,
    mint_authority: String,
    freeze_authority: String,
    features: FeatureOutput,
}

#[derive(Serialize)]
struct FeatureOutput {
    permanent_delegate: bool,
    transfer_hook: bool,
    default_frozen: bool,
}

#[derive(Serialize)]
struct BalanceOutput {
    owner: String,
    token_account: String,
    amount: u64,
    ui_amount: String,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_args(argv: &[&str]) -> InitArgs {
        let mut full = vec!["sss-token", "init"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Init(args) => args,
            _ => panic!("expected init"),
        }
    }

    #[test]
    fn parses_global_flags() {
        let cli = Cli::try_parse_from([
            "sss-token",
            "--cluster",
            "localnet",
            "--output",
            "json",
            "status",
            "--mint",
            "11111111111111111111111111111111",
        ])
        .unwrap();
        assert_eq!(cli.cluster.as_deref(), Some("localnet"));
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn parses_nested_subcommands() {
        let cli = Cli::try_parse_from([
            "sss-token",
            "authority",
            "set-freezer",
            "11111111111111111111111111111111",
            "--mint",
            "11111111111111111111111111111111",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Authority(AuthorityArgs {
                command: AuthorityCmd::SetFreezer(_)
            })
        ));
    }

    #[test]
    fn preset_defaults_authorities_to_signer() {
        let signer = Pubkey::new_unique();
        let hook = Pubkey::new_unique().to_string();
        let args = init_args(&[
            "--preset",
            "sss-2",
            "--name",
            "Test",
            "--symbol",
            "TST",
            "--transfer-hook-program",
            hook.as_str(),
        ]);
        let params = init_params(&args, None, &signer).unwrap();
        assert_eq!(params.validate(), Ok(()));
        assert_eq!(params.name, "Test");
        assert_eq!(params.decimals, 6);
        assert!(params.enable_permanent_delegate);
        assert!(params.enable_transfer_hook);
        assert_eq!(params.transfer_hook_program.map(|key| key.to_string()), Some(hook));
        assert_eq!(params.mint_authority, signer);
        assert_eq!(params.freeze_authority, signer);
    }

    #[test]
    fn compliance_preset_requires_hook_program() {
        let args = init_args(&["--preset", "sss-2", "--name", "Test", "--symbol", "TST"]);
        let err = init_params(&args, None, &Pubkey::new_unique()).unwrap_err();
        assert!(err.to_string().contains("--transfer-hook-program"));
    }

    #[test]
    fn hook_program_can_come_from_config() {
        let hook = Pubkey::new_unique();
        let config: SssConfig = toml::from_str(&format!(
            r#"
            [token]
            name = "Hooked"
            symbol = "HOOK"

            [extensions]
            transfer_hook = true
            transfer_hook_program = "{}"
            "#,
            hook
        ))
        .unwrap();
        let params = init_params(&init_args(&[]), Some(&config), &Pubkey::new_unique()).unwrap();
        assert_eq!(params.transfer_hook_program, Some(hook));
    }

    #[test]
    fn invalid_token_fields_fail_before_submission() {
        let args = init_args(&[
            "--preset",
            "sss-1",
            "--name",
            "Test",
            "--symbol",
            "TST",
            "--decimals",
            "12",
        ]);
        let err = init_params(&args, None, &Pubkey::new_unique()).unwrap_err();
        assert!(err.to_string().contains("decimals"));
    }

    #[test]
    fn explicit_authorities_override_signer() {
        let signer = Pubkey::new_unique();
        let minter = Pubkey::new_unique();
        let minter_str = minter.to_string();
        let args = init_args(&[
            "--preset",
            "sss-1",
            "--name",
            "Test",
            "--symbol",
            "TST",
            "--decimals",
            "9",
            "--mint-authority",
            minter_str.as_str(),
        ]);
        let params = init_params(&args, None, &signer).unwrap();
        assert_eq!(params.decimals, 9);
        assert!(!params.enable_transfer_hook);
        assert_eq!(params.mint_authority, minter);
        assert_eq!(params.freeze_authority, signer);
    }

    #[test]
    fn init_requires_preset_or_token_table() {
        let args = init_args(&["--name", "Test", "--symbol", "TST"]);
        assert!(init_params(&args, None, &Pubkey::new_unique()).is_err());
    }

    #[test]
    fn token_table_replaces_preset() {
        let config: SssConfig = toml::from_str(
            r#"
            [token]
            name = "Config Dollar"
            symbol = "CUSD"
            decimals = 2

            [extensions]
            permanent_delegate = true
            "#,
        )
        .unwrap();
        let args = init_args(&[]);
        let params = init_params(&args, Some(&config), &Pubkey::new_unique()).unwrap();
        assert_eq!(params.symbol, "CUSD");
        assert_eq!(params.decimals, 2);
        assert!(params.enable_permanent_delegate);
        assert!(!params.enable_transfer_hook);

        let args = init_args(&["--preset", "sss-1"]);
        assert!(init_params(&args, Some(&config), &Pubkey::new_unique()).is_err());
    }

    #[test]
    fn labels_presets() {
        assert_eq!(preset_label(true), "SSS-2");
        assert_eq!(preset_label(false), "SSS-1");
    }
}
