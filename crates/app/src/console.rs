//! Line-oriented terminal front end
//!
//! Each input line is parsed against the current view into a [`Command`] and
//! executed on the [`Session`].

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use hydra_core::{Error, NewAd, Plan, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;
use uuid::Uuid;

use crate::assistant::AssistantReply;
use crate::viewmodel::{AdminPanel, PaymentForm, SendOutcome, Session, View};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Logout,
    Login { email: String, secret: String },
    Register { email: String, secret: String },
    SelectPlan(Plan),
    CancelPlans,
    BackToPlans,
    Pay(PaymentForm),
    Send(String),
    OpenPlans,
    OpenSupport,
    CloseSupport,
    ClearChat,
    DismissAd,
    Users,
    Approve(String),
    Reject(String),
    Threads,
    Reply { email: String, text: String },
    Ads,
    AddAd(NewAd),
    DeleteAd(Uuid),
    SetAdActive { id: Uuid, active: bool },
    SetInterval(u32),
    Export(PathBuf),
    Import(PathBuf),
    Ask(String),
    Unknown(String),
}

/// Interpret a line in the context of `view`
pub fn parse_command(view: View, line: &str) -> Command {
    let line = line.trim();
    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match (head, view) {
        ("help", _) | ("/help", _) => return Command::Help,
        ("quit", _) | ("/quit", _) => return Command::Quit,
        ("logout", _) | ("/logout", _) if view != View::Auth => return Command::Logout,
        _ => {}
    }

    match view {
        View::Splash | View::Blocked => Command::Unknown(line.to_string()),
        View::Auth => {
            let mut args = rest.split_whitespace();
            match (head, args.next(), args.next()) {
                ("login", Some(email), Some(secret)) => Command::Login {
                    email: email.into(),
                    secret: secret.into(),
                },
                ("register", Some(email), Some(secret)) => Command::Register {
                    email: email.into(),
                    secret: secret.into(),
                },
                _ => Command::Unknown(line.to_string()),
            }
        }
        View::Plans => match (head, Plan::from_str(rest)) {
            ("select", Ok(plan)) => Command::SelectPlan(plan),
            ("cancel", _) => Command::CancelPlans,
            _ => Command::Unknown(line.to_string()),
        },
        View::Payment => match head {
            "back" => Command::BackToPlans,
            "pay" => {
                let mut args = rest.split_whitespace();
                Command::Pay(PaymentForm {
                    proof: args.next().unwrap_or_default().to_string(),
                    source: args.next().unwrap_or_default().to_string(),
                    creator: args.next().map(str::to_string),
                    coupon: args.next().map(str::to_string),
                })
            }
            _ => Command::Unknown(line.to_string()),
        },
        View::Chat => match head {
            "/plans" => Command::OpenPlans,
            "/support" => Command::OpenSupport,
            "/clear" => Command::ClearChat,
            "/ad" => Command::DismissAd,
            _ if head.starts_with('/') => Command::Unknown(line.to_string()),
            _ => Command::Send(line.to_string()),
        },
        View::Support => match head {
            "/close" => Command::CloseSupport,
            _ if head.starts_with('/') => Command::Unknown(line.to_string()),
            _ => Command::Send(line.to_string()),
        },
        View::Admin => parse_admin(head, rest, line),
    }
}

fn parse_admin(head: &str, rest: &str, line: &str) -> Command {
    let unknown = || Command::Unknown(line.to_string());
    match head {
        "users" => Command::Users,
        "approve" if !rest.is_empty() => Command::Approve(rest.to_string()),
        "reject" if !rest.is_empty() => Command::Reject(rest.to_string()),
        "threads" => Command::Threads,
        "reply" => match rest.split_once(' ') {
            Some((email, text)) => Command::Reply {
                email: email.to_string(),
                text: text.trim().to_string(),
            },
            None => unknown(),
        },
        "ads" => Command::Ads,
        "ad-add" => {
            let mut args = rest.split_whitespace();
            match (args.next(), args.next()) {
                (Some(title), Some(media_url)) => Command::AddAd(NewAd {
                    title: title.to_string(),
                    media_url: media_url.to_string(),
                    link: args.next().unwrap_or_default().to_string(),
                    description: args.collect::<Vec<_>>().join(" "),
                }),
                _ => unknown(),
            }
        }
        "ad-del" => Uuid::parse_str(rest).map(Command::DeleteAd).unwrap_or_else(|_| unknown()),
        "ad-on" | "ad-off" => match Uuid::parse_str(rest) {
            Ok(id) => Command::SetAdActive {
                id,
                active: head == "ad-on",
            },
            Err(_) => unknown(),
        },
        "interval" => rest.parse().map(Command::SetInterval).unwrap_or_else(|_| unknown()),
        "export" if !rest.is_empty() => Command::Export(PathBuf::from(rest)),
        "import" if !rest.is_empty() => Command::Import(PathBuf::from(rest)),
        "ask" if !rest.is_empty() => Command::Ask(rest.to_string()),
        _ => unknown(),
    }
}

fn help(view: View) -> &'static str {
    match view {
        View::Splash => "",
        View::Auth => "login <email> <password> | register <email> <password> | quit",
        View::Plans => "select basic|premium | cancel | logout",
        View::Payment => "pay <proof> <source> [creator] [coupon] | back | logout",
        View::Blocked => "Your payment is under review. logout | quit",
        View::Chat => "<message> | /plans | /support | /clear | /ad | /logout",
        View::Support => "<message> | /close | /logout",
        View::Admin => {
            "users | approve <email> | reject <email> | threads | reply <email> <text> | ads | \
             ad-add <title> <media> [link] [description] | ad-del <id> | ad-on <id> | ad-off <id> | interval <secs> | \
             export <file> | import <file> | ask <question> | logout"
        }
    }
}

/// Run until `quit` or end of input
pub async fn run(session: Session) -> Result<()> {
    let splash = Duration::from_millis(session.app().config.ui.splash_delay_ms);
    println!("HydraPro");
    tokio::time::sleep(splash).await;
    session.finish_splash();
    println!("{}", help(session.view()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_status(&session);
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = parse_command(session.view(), &line);
        if command == Command::Quit {
            break;
        }
        if let Err(e) = execute(&session, command).await {
            error!(error = %e, "Command failed");
            println!("! {}", e.user_message());
        }
    }

    session.logout();
    Ok(())
}

fn print_status(session: &Session) {
    if let Some(ad) = session.current_ad() {
        println!("[ad] {} {} ({}) /ad to close", ad.title, ad.link, ad.media_url);
    }
    match session.view() {
        View::Chat => {
            let remaining = session
                .remaining_free_time()
                .map(|r| format!(" {r} left"))
                .unwrap_or_default();
            let unread = if session.has_unread_reply() { " [support reply]" } else { "" };
            println!("chat{remaining}{unread} >");
        }
        view => println!("{view:?} >"),
    }
}

async fn execute(session: &Session, command: Command) -> Result<()> {
    match command {
        Command::Help => println!("{}", help(session.view())),
        Command::Quit => {}
        Command::Logout => session.logout(),
        Command::Login { email, secret } => {
            session.login(&email, &secret)?;
        }
        Command::Register { email, secret } => {
            session.register(&email, &secret)?;
        }
        Command::SelectPlan(plan) => {
            session.select_plan(plan)?;
            let key = session.pix_key();
            if !key.is_empty() {
                println!("PIX key: {key}");
            }
        }
        Command::CancelPlans => session.cancel_plans(),
        Command::BackToPlans | Command::OpenPlans => {
            session.open_plans()?;
            for offer in session.plan_offers() {
                println!("{} {}", offer.plan, offer.price);
            }
        }
        Command::Pay(form) => {
            session.submit_payment(&form)?;
        }
        Command::Send(text) if session.view() == View::Support => {
            session.send_support(&text)?;
            print_support(session);
        }
        Command::Send(text) => match session.send_chat(&text, None).await? {
            SendOutcome::Replied(reply) => print_reply(&reply),
            SendOutcome::Busy => println!("Still thinking..."),
            SendOutcome::Ignored | SendOutcome::Discarded => {}
        },
        Command::OpenSupport => {
            session.open_support()?;
            print_support(session);
        }
        Command::CloseSupport => session.close_support()?,
        Command::ClearChat => session.clear_transcript(),
        Command::DismissAd => session.dismiss_ad(),
        Command::Unknown(_) => println!("{}", help(session.view())),
        admin => execute_admin(session, admin).await?,
    }
    Ok(())
}

async fn execute_admin(session: &Session, command: Command) -> Result<()> {
    let mut panel = session.admin_panel()?;
    match command {
        Command::Users => {
            let stats = panel.stats();
            println!(
                "{} accounts, {} approved, {} pending",
                stats.total, stats.approved, stats.pending
            );
            for user in panel.users() {
                println!(
                    "{} {} {} {}s {}",
                    user.email,
                    user.plan,
                    user.payment_status,
                    user.usage_seconds,
                    user.referral_source.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Approve(email) => {
            let user = panel.approve(&email)?;
            println!("{} approved ({})", user.email, user.plan);
        }
        Command::Reject(email) => {
            let user = panel.reject(&email)?;
            println!("{} rejected", user.email);
        }
        Command::Threads => {
            for thread in panel.threads() {
                println!("== {}", thread.email);
                for message in &thread.messages {
                    let who = if message.is_admin_reply { "admin" } else { "user" };
                    println!("  [{}] {}: {}", message.format_timestamp(), who, message.text);
                }
            }
        }
        Command::Reply { email, text } => panel.reply(&email, &text)?,
        Command::Ads => {
            println!("every {}s", panel.config().ad_interval_seconds);
            for ad in &panel.config().ads {
                let state = if ad.is_active { "on" } else { "off" };
                println!("{} [{}] {} {}", ad.id, state, ad.title, ad.media_url);
            }
        }
        Command::AddAd(new_ad) => {
            let ad = panel.add_ad(new_ad)?;
            println!("added {}", ad.id);
        }
        Command::DeleteAd(id) => {
            if !panel.delete_ad(id)? {
                println!("no such ad");
            }
        }
        Command::SetAdActive { id, active } => {
            if !panel.set_ad_active(id, active)? {
                println!("no such ad");
            }
        }
        Command::SetInterval(seconds) => panel.set_ad_interval(seconds)?,
        Command::Export(path) => {
            save_backup(&panel, &path).await?;
            println!("saved {}", path.display());
        }
        Command::Import(path) => {
            load_backup(&mut panel, &path).await?;
            println!("restored {} accounts", panel.users().len());
        }
        Command::Ask(question) => print_reply(&panel.ask_insights(&question).await),
        other => {
            return Err(Error::InvalidOperation(format!("{other:?} is not an admin command")));
        }
    }
    Ok(())
}

/// Write the backup blob to `path`
pub async fn save_backup(panel: &AdminPanel, path: &Path) -> Result<()> {
    let blob = panel.export_backup()?;
    tokio::fs::write(path, blob).await?;
    Ok(())
}

/// Replace the store with the backup at `path`
pub async fn load_backup(panel: &mut AdminPanel, path: &Path) -> Result<()> {
    let blob = tokio::fs::read_to_string(path).await?;
    panel.restore_backup(&blob)
}

fn print_reply(reply: &AssistantReply) {
    println!("{}", reply.text);
    if let Some(image) = &reply.image {
        println!("[image {} bytes]", image.len());
    }
    if let Some(video) = &reply.video {
        println!("[cinematic still {} bytes]", video.len());
    }
}

fn print_support(session: &Session) {
    for message in session.support_thread() {
        let who = if message.is_admin_reply { "support" } else { "you" };
        println!("[{}] {}: {}", message.format_timestamp(), who, message.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewmodel::test_support::app;

    #[test]
    fn auth_commands() {
        assert_eq!(
            parse_command(View::Auth, "login ana@example.com pw"),
            Command::Login {
                email: "ana@example.com".into(),
                secret: "pw".into()
            }
        );
        assert!(matches!(parse_command(View::Auth, "login ana"), Command::Unknown(_)));
        assert!(matches!(parse_command(View::Auth, "logout"), Command::Unknown(_)));
    }

    #[test]
    fn chat_text_is_sent() {
        assert_eq!(
            parse_command(View::Chat, "how do lifetimes work?"),
            Command::Send("how do lifetimes work?".into())
        );
        assert_eq!(parse_command(View::Chat, "/support"), Command::OpenSupport);
        assert_eq!(parse_command(View::Chat, "/logout"), Command::Logout);
    }

    #[test]
    fn plan_and_payment_commands() {
        assert_eq!(parse_command(View::Plans, "select premium"), Command::SelectPlan(Plan::Premium));
        assert!(matches!(parse_command(View::Plans, "select gold"), Command::Unknown(_)));
        assert_eq!(
            parse_command(View::Payment, "pay proof.png Instagram @maria"),
            Command::Pay(PaymentForm {
                proof: "proof.png".into(),
                source: "Instagram".into(),
                creator: Some("@maria".into()),
                coupon: None,
            })
        );
    }

    #[test]
    fn admin_commands() {
        assert_eq!(
            parse_command(View::Admin, "reply ana@example.com hello there"),
            Command::Reply {
                email: "ana@example.com".into(),
                text: "hello there".into()
            }
        );
        assert_eq!(parse_command(View::Admin, "interval 30"), Command::SetInterval(30));
        assert!(matches!(parse_command(View::Admin, "interval soon"), Command::Unknown(_)));
        assert!(matches!(parse_command(View::Admin, "ad-del nope"), Command::Unknown(_)));

        let id = Uuid::new_v4();
        assert_eq!(
            parse_command(View::Admin, &format!("ad-off {id}")),
            Command::SetAdActive { id, active: false }
        );
        assert_eq!(
            parse_command(View::Admin, &format!("ad-on {id}")),
            Command::SetAdActive { id, active: true }
        );
    }

    #[tokio::test]
    async fn backup_file_restores_the_saved_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let app = app();

        let admin = Session::new(app.clone());
        admin.login("owner@hydra.dev", "owner-secret").unwrap();
        let mut panel = admin.admin_panel().unwrap();
        save_backup(&panel, &path).await.unwrap();
        assert!(tokio::fs::read_to_string(&path).await.unwrap().contains("owner@hydra.dev"));

        let user = Session::new(app);
        user.register("ana@example.com", "pw").unwrap();
        user.logout();

        load_backup(&mut panel, &path).await.unwrap();
        assert!(panel.users().iter().all(|u| u.email != "ana@example.com"));
        assert!(user.login("ana@example.com", "pw").is_err());
    }

    #[tokio::test]
    async fn missing_backup_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let admin = Session::new(app());
        admin.login("owner@hydra.dev", "owner-secret").unwrap();
        let mut panel = admin.admin_panel().unwrap();

        let err = load_backup(&mut panel, &dir.path().join("absent.json")).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
