//! XyraChain - chest X-ray analysis with on-chain report anchoring

use anyhow::Context;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xyrachain::{
    analysis::{AnalysisWorkflow, ImageFile},
    backend::{HttpBackend, TriageClient, WidgetChatClient},
    chain::{ConfirmationPolicy, NetworkParams, XyraChainContract},
    chat::ChatSession,
    config::{Args, Command},
    mint::Minter,
    report::ReportGenerator,
    server::{self, AppState},
    types::Notifier,
    vault,
    wallet::{LocalWallet, WalletSession},
};

const TEST_REPORT_CID: &str = "QmTestHash123456789";
const TEST_REPORT_DIAGNOSIS: &str = "Test: Normal chest X-ray";
const TEST_REPORT_CONFIDENCE: u64 = 95;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("xyrachain={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  XyraChain v{}", env!("CARGO_PKG_VERSION"));
    info!("======================================");
    info!("Backend: {}", args.backend_url);
    info!("Triage: {}", args.triage_url);
    info!("RPC: {} (chain {})", args.rpc_url, args.chain_id);
    info!("Contract: {}", args.contract_address);
    info!(
        "Wallet: {}",
        if args.private_key.is_some() { "local key" } else { "none" }
    );
    info!("======================================");

    match args.command.clone() {
        Command::Serve { listen } => {
            let state = Arc::new(AppState::from_args(&args)?);
            server::run(state, listen).await?;
        }
        Command::Analyze { file, report, mint } => {
            analyze(&args, &file, report.as_deref(), mint).await?;
        }
        Command::Chat { message } => {
            let chat = ChatSession::widget(Arc::new(WidgetChatClient::new(
                &args.backend_url,
                args.request_timeout(),
            )?));
            print_reply(&chat, &message).await?;
        }
        Command::Triage { message } => {
            let chat = ChatSession::triage(Arc::new(TriageClient::new(
                &args.triage_url,
                args.request_timeout(),
            )?));
            print_reply(&chat, &message).await?;
        }
        Command::Reports => {
            let wallet = local_wallet(&args)?;
            let reports = contract(&args)?
                .get_my_reports(&wallet, wallet.address())
                .await?;
            info!("{} report(s) for {}", reports.len(), wallet.address());
            print_json(&vault::records_from_chain(&reports))?;
        }
        Command::Vault => print_json(&vault::mock_vault())?,
        Command::Profile => print_json(&vault::mock_profile())?,
        Command::Deploy { artifact } => deploy(&args, &artifact).await?,
        Command::Verify => verify(&args).await?,
    }

    Ok(())
}

fn local_wallet(args: &Args) -> anyhow::Result<LocalWallet> {
    let key = args
        .private_key
        .as_deref()
        .context("PRIVATE_KEY is required for this command")?;
    let network = NetworkParams::for_chain(args.chain_id, &args.rpc_url);
    Ok(LocalWallet::new(key, network, args.request_timeout())?)
}

fn confirmation(args: &Args) -> ConfirmationPolicy {
    ConfirmationPolicy {
        poll_interval: args.confirmation_poll(),
        max_polls: args.confirmation_max_polls,
    }
}

fn contract(args: &Args) -> anyhow::Result<XyraChainContract> {
    Ok(XyraChainContract::new(
        args.contract_address.parse()?,
        confirmation(args),
    ))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn print_reply(chat: &ChatSession, message: &str) -> anyhow::Result<()> {
    match chat.send(message).await? {
        Some(reply) => println!("{}", reply.body),
        None => warn!("Nothing to send"),
    }
    Ok(())
}

async fn analyze(
    args: &Args,
    path: &Path,
    report_path: Option<&Path>,
    mint: bool,
) -> anyhow::Result<()> {
    let notifier = Arc::new(Notifier::default());
    let backend = Arc::new(HttpBackend::new(args.backend_url.clone(), args.request_timeout())?);
    let workflow = AnalysisWorkflow::new(backend, notifier);

    let file = ImageFile::from_path(path).await?;
    info!("Selected {} ({} MB)", file.name, file.size_mb());
    workflow.select_file(file).await?;

    let result = workflow.start_analysis().await?;
    println!("Diagnosis: {}", result.diagnosis);
    println!("Confidence: {}%", result.confidence);
    println!("Pneumonia probability: {}%", result.pneumonia_probability());
    if !result.heatmap.is_empty() {
        println!("Heatmap: {}", result.heatmap);
    }

    if let Some(report_path) = report_path {
        let (result, file) = workflow.completed("download a report").await?;
        let generator = ReportGenerator::new(args.request_timeout())?;
        let report = generator.generate(&result, &file, None).await?;
        tokio::fs::write(report_path, &report.bytes)
            .await
            .with_context(|| format!("failed to write {}", report_path.display()))?;
        println!("Report: {} (CID {})", report_path.display(), report.cid);
    }

    if mint {
        let wallet = WalletSession::new(Arc::new(local_wallet(args)?));
        wallet.connect().await?;

        let network = NetworkParams::for_chain(args.chain_id, &args.rpc_url);
        let minter = Minter::new(contract(args)?, network, args.chain_switch_settle());
        let record = minter.mint(&workflow, &wallet).await?;
        println!("IPFS CID: {}", record.cid);
        println!("Tx Hash: {}", record.tx_hash);
        if let Some(url) = record.explorer_url {
            println!("Explorer: {}", url);
        }
    }

    Ok(())
}

async fn deploy(args: &Args, artifact: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(artifact)
        .await
        .with_context(|| format!("failed to read {}", artifact.display()))?;
    let json: serde_json::Value = serde_json::from_str(&raw)?;
    let bytecode = json["bytecode"]
        .as_str()
        .context("artifact has no string 'bytecode' field")?;
    let bytecode = hex::decode(bytecode.trim_start_matches("0x"))
        .context("artifact bytecode is not valid hex")?;

    let wallet = local_wallet(args)?;
    info!(
        "Deploying {} bytes from {}",
        bytecode.len(),
        wallet.address()
    );
    let deployed =
        XyraChainContract::deploy(&wallet, wallet.address(), bytecode, confirmation(args)).await?;
    println!("XyraChain deployed to: {}", deployed.address());
    Ok(())
}

async fn verify(args: &Args) -> anyhow::Result<()> {
    let wallet = local_wallet(args)?;
    let account = wallet.address();
    let contract = contract(args)?;
    println!("Contract: {}", contract.address());
    println!("Account: {}", account);

    let before = contract.get_my_reports(&wallet, account).await?;
    println!("Existing reports: {}", before.len());

    let tx_hash = contract
        .add_report(
            &wallet,
            account,
            TEST_REPORT_CID,
            TEST_REPORT_DIAGNOSIS,
            TEST_REPORT_CONFIDENCE,
        )
        .await?;
    println!("Test report sent: {}", tx_hash);
    contract.wait_for_confirmation(&wallet, &tx_hash).await?;

    let after = contract.get_my_reports(&wallet, account).await?;
    println!("Reports after test: {}", after.len());
    match after.last() {
        Some(latest) => {
            println!("Latest IPFS hash: {}", latest.ipfs_hash);
            println!("Latest diagnosis: {}", latest.diagnosis);
            println!("Latest confidence: {}", latest.confidence);
            println!("Latest timestamp: {}", latest.timestamp);
        }
        None => anyhow::bail!("test report was not returned by getMyReports"),
    }
    Ok(())
}
