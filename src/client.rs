use crate::ui;
use alloy::signers::local::PrivateKeySigner;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use friendship_faucet::{
    binding::WriteCall,
    chain::RpcChain,
    config::{
        Command,
        FaucetConfig,
    },
    controller::{
        FaucetController,
        StatusReport,
    },
    error::{
        FaucetError,
        FaucetResult,
    },
    format::parse_age,
    submit::{
        self,
        TransactionOutcome,
        TxPhase,
        TxProgress,
    },
    wallet::{
        WalletDescriptor,
        WalletSource,
        find_wallet,
        unlock_wallet,
    },
};
use rpassword::prompt_password;
use tokio::{
    sync::mpsc,
    task,
};
use tracing::{
    info,
    warn,
};

type Controller = FaucetController<RpcChain>;

/// `None` when signing is left to the node.
fn keystore_descriptor(config: &FaucetConfig) -> FaucetResult<Option<WalletDescriptor>> {
    match &config.wallet {
        WalletSource::NodeAccounts => Ok(None),
        WalletSource::Keystore { dir, name } => find_wallet(dir, name.as_deref()).map(Some),
    }
}

/// Keystore decryption blocks for a while, so it runs on the blocking pool.
async fn unlock_off_thread(
    descriptor: WalletDescriptor,
    password: Option<String>,
) -> FaucetResult<PrivateKeySigner> {
    task::spawn_blocking(move || unlock_wallet(&descriptor, password.as_deref()))
        .await
        .map_err(|e| FaucetError::WalletLocked(format!("keystore unlock aborted: {e}")))?
}

async fn connect_with(
    controller: &mut Controller,
    descriptor: Option<WalletDescriptor>,
    password: Option<String>,
) -> FaucetResult<()> {
    let (signer, keystore) = match descriptor {
        Some(descriptor) => {
            let name = descriptor.name.clone();
            match unlock_off_thread(descriptor, password).await {
                Ok(signer) => (Some(signer), Some(name)),
                Err(err) => {
                    controller.connect_failed(&err);
                    return Err(err);
                }
            }
        }
        None => (None, None),
    };
    let config = controller.config();
    let chain = RpcChain::connect(config.rpc_url.clone(), signer, config.confirm_timeout);
    controller.connect(chain, keystore.as_deref()).await
}

fn print_status(report: &StatusReport) {
    println!("Contract:        {}", report.contract);
    println!(
        "Account:         {}",
        report.account.as_deref().unwrap_or("not connected")
    );
    println!("Friend:          {}", report.is_friend);
    println!("Reward received: {}", report.has_received_reward);
    println!(
        "Attempts:        {} ({} remaining)",
        report.attempt_count, report.remaining_attempts
    );
    println!("Reward:          {} wei", report.reward_amount_wei);
    println!("Balance:         {} ETH", report.contract_balance_eth);
    if !report.stale_fields.is_empty() {
        println!("Stale:           {}", report.stale_fields.join(", "));
    }
}

/// Connects, refreshes and runs a single command without the TUI.
pub async fn run_command(config: FaucetConfig, command: Command) -> Result<()> {
    let mut controller = Controller::new(config);
    let descriptor =
        keystore_descriptor(controller.config()).wrap_err("Unable to locate wallet")?;
    let password = descriptor.as_ref().and_then(|descriptor| {
        prompt_password(format!("Enter password for keystore '{}': ", descriptor.name)).ok()
    });
    connect_with(&mut controller, descriptor, password)
        .await
        .wrap_err("Failed to connect wallet")?;
    for err in controller.errors() {
        eprintln!("warning: {err}");
    }

    let call = match command {
        Command::Tui => return Err(eyre!("the tui command is not a one-shot command")),
        Command::Status { json } => {
            let report = controller.status_report();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_status(&report);
            }
            return Ok(());
        }
        Command::Guess { age } => controller.guess_call(age),
        Command::Deposit => controller.deposit_call(),
        Command::Withdraw => controller.withdraw_call(),
    };

    let outcome = controller
        .submit(call, |outcome| {
            if let Some(tx_hash) = outcome.tx_hash()
                && outcome.phase() == TxPhase::PendingConfirmation
            {
                println!("{} ({tx_hash})", outcome.status_line());
            } else if outcome.phase() != TxPhase::Idle {
                println!("{}", outcome.status_line());
            }
        })
        .await
        .wrap_err_with(|| format!("Unable to submit {}", call.operation()))?;

    match outcome {
        TransactionOutcome::Failed { call, error } => {
            Err(eyre!("{} failed: {error}", call.operation()))
        }
        _ => {
            print_status(&controller.status_report());
            Ok(())
        }
    }
}

pub async fn run_app(config: FaucetConfig) -> Result<()> {
    let controller = Controller::new(config);
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(controller, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

fn show_processing_status(
    controller: &mut Controller,
    ui_state: &mut ui::UiState,
    message: impl Into<String>,
    context: &'static str,
) -> Result<()> {
    controller.set_status(message);
    ui::draw(ui_state, &controller.snapshot()).wrap_err(context)
}

/// Hands `call` to a background task; progress comes back over `progress_tx`.
fn start_submission(
    controller: &mut Controller,
    call: WriteCall,
    progress_tx: &mpsc::UnboundedSender<TxProgress>,
) {
    match controller.spawn_parts(call) {
        Ok((chain, handle)) => {
            let progress_tx = progress_tx.clone();
            tokio::spawn(async move {
                submit::drive(chain.as_ref(), &handle, call, |progress| {
                    let _ = progress_tx.send(progress);
                })
                .await;
            });
        }
        Err(err) => controller.push_error(format!("Cannot {}: {err}", call.operation())),
    }
}

async fn begin_connect(
    controller: &mut Controller,
    ui_state: &mut ui::UiState,
    pending_keystore: &mut Option<WalletDescriptor>,
) -> Result<()> {
    if controller.is_in_flight() {
        controller.push_error(format!("Cannot reconnect: {}", FaucetError::SubmissionInFlight));
        return Ok(());
    }
    match keystore_descriptor(controller.config()) {
        Ok(Some(descriptor)) => {
            ui_state.open_password_prompt(descriptor.name.clone());
            *pending_keystore = Some(descriptor);
        }
        Ok(None) => {
            show_processing_status(controller, ui_state, "Connecting...", "draw before connect failed")?;
            if let Err(err) = connect_with(controller, None, None).await {
                warn!(error = %err, "wallet connection failed");
            }
        }
        Err(err) => controller.connect_failed(&err),
    }
    Ok(())
}

/// `password` is `None` when the prompt was dismissed.
async fn finish_connect(
    controller: &mut Controller,
    ui_state: &mut ui::UiState,
    pending_keystore: &mut Option<WalletDescriptor>,
    password: Option<String>,
) -> Result<()> {
    let Some(descriptor) = pending_keystore.take() else {
        return Ok(());
    };
    show_processing_status(
        controller,
        ui_state,
        "Unlocking wallet...",
        "draw before unlock failed",
    )?;
    if let Err(err) = connect_with(controller, Some(descriptor), password).await {
        warn!(error = %err, "wallet connection failed");
    }
    Ok(())
}

async fn run_loop(
    mut controller: Controller,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    info!("Running app loop");
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let mut pending_keystore: Option<WalletDescriptor> = None;
    ui::draw(ui_state, &controller.snapshot()).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            Some(progress) = progress_rx.recv() => {
                controller.apply_progress(progress).await;
            }
            _ = tokio::signal::ctrl_c() => break,
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::Connect => {
                        begin_connect(&mut controller, ui_state, &mut pending_keystore).await?;
                    }
                    ui::UserEvent::SubmitPassword(password) => {
                        finish_connect(
                            &mut controller,
                            ui_state,
                            &mut pending_keystore,
                            Some(password),
                        )
                        .await?;
                    }
                    ui::UserEvent::CancelPassword => {
                        finish_connect(&mut controller, ui_state, &mut pending_keystore, None)
                            .await?;
                    }
                    ui::UserEvent::SubmitGuess(input) => match parse_age(&input) {
                        Ok(age) => {
                            let call = controller.guess_call(age);
                            start_submission(&mut controller, call, &progress_tx);
                        }
                        Err(err) => controller.push_error(err.to_string()),
                    },
                    ui::UserEvent::Deposit => {
                        let call = controller.deposit_call();
                        start_submission(&mut controller, call, &progress_tx);
                    }
                    ui::UserEvent::Withdraw => {
                        let call = controller.withdraw_call();
                        start_submission(&mut controller, call, &progress_tx);
                    }
                }
            }
        }
        ui::draw(ui_state, &controller.snapshot()).wrap_err("draw failed")?;
    }
    Ok(())
}
