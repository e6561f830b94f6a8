use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        self,
        Event,
        KeyCode,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use friendship_faucet::{
    controller::FaucetSnapshot,
    format::{
        format_ether,
        short_address,
    },
    submit::TxPhase,
    sync::Field,
    wallet::SigningIdentity,
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::{
    io::stdout,
    thread,
};
use tokio::sync::mpsc;

pub type InputEventReceiver = mpsc::UnboundedReceiver<std::io::Result<Event>>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Connect,
    SubmitPassword(String),
    CancelPassword,
    SubmitGuess(String),
    Deposit,
    Withdraw,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    reward_received: bool,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
enum Mode {
    #[default]
    Normal,
    GuessModal(String),
    PasswordModal { wallet: String, input: String },
    QuitModal,
}

impl UiState {
    /// Asks for the password of keystore `wallet`.
    pub fn open_password_prompt(&mut self, wallet: impl Into<String>) {
        self.mode = Mode::PasswordModal {
            wallet: wallet.into(),
            input: String::new(),
        };
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

/// Blocking terminal reads happen on their own thread.
pub fn input_event_stream() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        loop {
            let event = event::read();
            let failed = event.is_err();
            if tx.send(event).is_err() || failed {
                break;
            }
        }
    });
    rx
}

pub async fn next_raw_event(input: &mut InputEventReceiver) -> Result<Event> {
    match input.recv().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn draw(state: &mut UiState, snap: &FaucetSnapshot) -> Result<()> {
    state.reward_received = snap.observed.has_received_reward;
    if state.reward_received && matches!(state.mode, Mode::GuessModal(_)) {
        state.mode = Mode::Normal;
    }
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let k = match event {
        Event::Key(k) => k,
        Event::Resize(..) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    if k.kind != KeyEventKind::Press {
        return None;
    }
    // Raw mode delivers ctrl-c as a key press rather than a signal.
    if k.code == KeyCode::Char('c') && k.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(UserEvent::Quit);
    }
    match &mut state.mode {
        Mode::GuessModal(input) => {
            return match k.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let age = std::mem::take(input);
                    state.mode = Mode::Normal;
                    Some(UserEvent::SubmitGuess(age))
                }
                KeyCode::Backspace => {
                    input.pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    input.push(c);
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::PasswordModal { input, .. } => {
            return match k.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::CancelPassword)
                }
                KeyCode::Enter => {
                    let password = std::mem::take(input);
                    state.mode = Mode::Normal;
                    Some(UserEvent::SubmitPassword(password))
                }
                KeyCode::Backspace => {
                    input.pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::QuitModal => {
            return match k.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::Normal => {}
    }
    match k.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('c') => Some(UserEvent::Connect),
        KeyCode::Char('g') if !state.reward_received => {
            state.mode = Mode::GuessModal(String::new());
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('d') => Some(UserEvent::Deposit),
        KeyCode::Char('w') => Some(UserEvent::Withdraw),
        _ => None,
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &FaucetSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // wallet
            Constraint::Length(7), // faucet
            Constraint::Min(6),    // status/errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_wallet_panel(f, chunks[0], snap);
    draw_faucet_panel(f, chunks[1], snap);
    draw_status_panel(f, chunks[2], snap);
    draw_help(f, chunks[3], snap);
    draw_modals(f, state);
}

fn draw_wallet_panel(f: &mut Frame, area: Rect, snap: &FaucetSnapshot) {
    let text = match &snap.connected {
        None => String::from("Not connected | press c to connect your wallet"),
        Some((address, identity)) => {
            let source = match identity {
                SigningIdentity::Keystore { name, .. } => format!("Keystore: {name}"),
                SigningIdentity::NodeAccount(_) => String::from("Node account"),
            };
            let role = match snap.is_owner {
                Some(true) => " | Owner",
                _ => "",
            };
            format!("Account: {address} | {source}{role}")
        }
    };
    let widget = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(widget, area);
}

fn stale_marker(snap: &FaucetSnapshot, field: Field) -> &'static str {
    if snap.stale_fields.contains(&field) {
        " (stale)"
    } else {
        ""
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn draw_faucet_panel(f: &mut Frame, area: Rect, snap: &FaucetSnapshot) {
    let observed = &snap.observed;
    let mut lines = vec![
        Line::from(format!(
            "Contract: {} | Balance: {} ETH{}",
            short_address(&snap.contract_address),
            format_ether(observed.contract_balance_wei),
            stale_marker(snap, Field::ContractBalance)
        )),
        Line::from(format!(
            "Reward: {} wei{}",
            observed.reward_amount_wei,
            stale_marker(snap, Field::RewardAmount)
        )),
    ];
    if snap.connected.is_some() {
        lines.push(Line::from(format!(
            "Friend: {}{} | Reward received: {}{}",
            yes_no(observed.is_friend),
            stale_marker(snap, Field::IsFriend),
            yes_no(observed.has_received_reward),
            stale_marker(snap, Field::HasReceivedReward)
        )));
        let mut attempts = Line::from(format!(
            "Remaining attempts: {} of {}{}",
            snap.remaining_attempts,
            snap.max_attempts,
            stale_marker(snap, Field::AttemptCount)
        ));
        if snap.attempt_limit_exceeded {
            attempts = attempts.style(Style::default().fg(Color::Yellow));
        }
        lines.push(attempts);
    }
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Faucet"));
    f.render_widget(widget, area);
}

fn draw_status_panel(f: &mut Frame, area: Rect, snap: &FaucetSnapshot) {
    let status_widget = if snap.errors.is_empty() {
        let mut lines: Vec<Line> = Vec::new();
        if snap.status.trim().is_empty() {
            lines.push(Line::from("Ready"));
        } else {
            for line in snap.status.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        if let Some(tx_hash) = snap.outcome.tx_hash() {
            lines.push(Line::from(format!("Tx: {tx_hash}")));
        }
        let color = match snap.outcome.phase() {
            TxPhase::Submitting | TxPhase::PendingConfirmation => Color::Yellow,
            _ => Color::Green,
        };
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(color))
    } else {
        let lines: Vec<Line> = snap.errors.iter().map(|e| Line::from(e.clone())).collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(status_widget, area);
}

fn draw_help(f: &mut Frame, area: Rect, snap: &FaucetSnapshot) {
    let help = if snap.connected.is_none() {
        "c connect | q/Esc quit"
    } else if snap.observed.has_received_reward {
        "d deposit 0.001 ETH | w withdraw | q/Esc quit"
    } else {
        "g guess age | d deposit 0.001 ETH | w withdraw | q/Esc quit"
    };
    let widget =
        Paragraph::new(help).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(widget, area);
}

fn draw_modals(f: &mut Frame, state: &UiState) {
    match &state.mode {
        Mode::GuessModal(input) => {
            let area = centered_rect(40, 25, f.area());
            let block = Block::default().borders(Borders::ALL).title("Guess My Age");
            let p = Paragraph::new(format!(
                "Age: {input}\nEnter=submit Esc=cancel digits to edit"
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::PasswordModal { wallet, input } => {
            let area = centered_rect(50, 25, f.area());
            let block = Block::default().borders(Borders::ALL).title("Unlock Wallet");
            let p = Paragraph::new(format!(
                "Password for '{wallet}': {}\nEnter=unlock Esc=cancel",
                "*".repeat(input.chars().count())
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Quit? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}
