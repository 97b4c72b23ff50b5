//! Command parsing and dispatch for the `serveline` binary.
//! Commands are thin: they call into the session core and print what comes back.

pub mod outputformatter;

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::context::ClientContext;
use crate::error::ClientError;
use crate::identity::{permit, routes_for, SessionStatus, UserProfile, ADMIN_ROLES};
use crate::staff::{CreateStaff, StaffFilter, UpdateStaffStatus};

pub use outputformatter::{print_staff_table, render_table};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { email: String, password: String },
    Logout,
    Whoami,
    Routes,
    StaffList(StaffFilter),
    StaffGet(i64),
    StaffCreate { name: String, email: String, password: String, role: String, phone: Option<String> },
    StaffStatus { id: i64, update: StatusFlags },
    Repl,
    Help,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFlags {
    pub is_active: Option<bool>,
    pub can_login: Option<bool>,
}

pub const USAGE: &str = "\
Commands:
  login <email> <password>                         log in and store the session tokens
  logout                                           forget the stored session
  whoami                                           show the logged-in user
  routes                                           list the screens your role may open
  staff list [--role R] [--active true|false]      list staff (ADMIN/OWNER)
  staff get <id>                                   show one staff member (ADMIN/OWNER)
  staff create <name> <email> <password> <role> [phone]
  staff status <id> [--active true|false] [--can-login true|false]
  repl                                             interactive mode
  help                                             show this help";

fn parse_bool(flag: &str, v: Option<&String>) -> std::result::Result<bool, String> {
    match v.map(|s| s.to_ascii_lowercase()) {
        Some(s) if s == "true" => Ok(true),
        Some(s) if s == "false" => Ok(false),
        _ => Err(format!("{} requires true or false", flag)),
    }
}

fn parse_id(v: Option<&String>) -> std::result::Result<i64, String> {
    v.ok_or_else(|| "missing staff id".to_string())?
        .parse::<i64>()
        .map_err(|_| "staff id must be a number".to_string())
}

pub fn parse_command(args: &[String]) -> std::result::Result<Command, String> {
    let Some(head) = args.first() else { return Ok(Command::Help); };
    match head.to_ascii_lowercase().as_str() {
        "login" => match (args.get(1), args.get(2)) {
            (Some(e), Some(p)) => Ok(Command::Login { email: e.clone(), password: p.clone() }),
            _ => Err("usage: login <email> <password>".into()),
        },
        "logout" => Ok(Command::Logout),
        "whoami" | "me" => Ok(Command::Whoami),
        "routes" => Ok(Command::Routes),
        "repl" => Ok(Command::Repl),
        "help" | "-h" | "--help" => Ok(Command::Help),
        "staff" => parse_staff(&args[1..]),
        other => Err(format!("unknown command '{}'", other)),
    }
}

fn parse_staff(args: &[String]) -> std::result::Result<Command, String> {
    let Some(sub) = args.first() else { return Err("usage: staff <list|get|create|status> ...".into()); };
    match sub.as_str() {
        "list" => {
            let mut filter = StaffFilter::default();
            let mut i = 1;
            while i < args.len() {
                match args[i].as_str() {
                    "--role" => {
                        let r = args.get(i + 1).ok_or("--role requires a value")?;
                        filter.role = Some(r.parse()?);
                    }
                    "--active" => filter.is_active = Some(parse_bool("--active", args.get(i + 1))?),
                    unk => return Err(format!("unrecognized argument '{}'", unk)),
                }
                i += 2;
            }
            Ok(Command::StaffList(filter))
        }
        "get" => Ok(Command::StaffGet(parse_id(args.get(1))?)),
        "create" => {
            if args.len() < 5 {
                return Err("usage: staff create <name> <email> <password> <role> [phone]".into());
            }
            Ok(Command::StaffCreate {
                name: args[1].clone(),
                email: args[2].clone(),
                password: args[3].clone(),
                role: args[4].clone(),
                phone: args.get(5).cloned(),
            })
        }
        "status" => {
            let id = parse_id(args.get(1))?;
            let mut update = StatusFlags::default();
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--active" => update.is_active = Some(parse_bool("--active", args.get(i + 1))?),
                    "--can-login" => update.can_login = Some(parse_bool("--can-login", args.get(i + 1))?),
                    unk => return Err(format!("unrecognized argument '{}'", unk)),
                }
                i += 2;
            }
            if update == StatusFlags::default() {
                return Err("staff status needs --active and/or --can-login".into());
            }
            Ok(Command::StaffStatus { id, update })
        }
        other => Err(format!("unknown staff command '{}'", other)),
    }
}

/// Make sure the session has a hydrated user, fetching the profile for a resumed session.
async fn current_user(ctx: &ClientContext) -> Result<Option<UserProfile>, ClientError> {
    let session = ctx.auth.session();
    if session.status != SessionStatus::Authenticated {
        return Ok(None);
    }
    match session.user {
        Some(u) => Ok(Some(u)),
        None => ctx.auth.fetch_profile().await.map(Some),
    }
}

fn report(err: &ClientError) {
    match err {
        ClientError::SessionExpired => eprintln!("session expired, please log in again"),
        ClientError::InvalidCredentials { message } => eprintln!("login failed: {}", message),
        other => eprintln!("error: {}", other),
    }
}

/// Gate for staff screens. Prints and returns false when the role is not allowed.
async fn ensure_staff_admin(ctx: &ClientContext) -> bool {
    match current_user(ctx).await {
        Ok(Some(u)) if permit(u.role, ADMIN_ROLES) => true,
        Ok(Some(u)) => {
            eprintln!("access denied: {} cannot manage staff", u.role);
            false
        }
        Ok(None) => {
            eprintln!("not logged in");
            false
        }
        Err(e) => {
            report(&e);
            false
        }
    }
}

/// Run one command. Client errors are printed; the result is `Err` only for I/O problems.
pub async fn run_command(ctx: &ClientContext, cmd: Command) -> Result<()> {
    match cmd {
        Command::Help => println!("{}", USAGE),
        Command::Repl => eprintln!("repl is started from the binary entry point"),
        Command::Login { email, password } => match ctx.auth.login(&email, &password).await {
            Ok(u) => println!("logged in as {} <{}> ({})", u.name, u.email, u.role),
            Err(e) => report(&e),
        },
        Command::Logout => {
            ctx.auth.logout();
            println!("logged out");
        }
        Command::Whoami => match current_user(ctx).await {
            Ok(Some(u)) => println!(
                "{} <{}> role={} restaurant={} active={} can_login={}",
                u.name, u.email, u.role, u.restaurant_id, u.is_active, u.can_login
            ),
            Ok(None) => println!("not logged in"),
            Err(e) => report(&e),
        },
        Command::Routes => match current_user(ctx).await {
            Ok(Some(u)) => {
                for r in routes_for(u.role) {
                    println!("{:<14} {}", r.path, r.title);
                }
            }
            Ok(None) => println!("not logged in"),
            Err(e) => report(&e),
        },
        Command::StaffList(filter) => {
            if ensure_staff_admin(ctx).await {
                match ctx.staff.list(filter).await {
                    Ok(list) => print_staff_table(&list),
                    Err(e) => report(&e),
                }
            }
        }
        Command::StaffGet(id) => {
            if ensure_staff_admin(ctx).await {
                match ctx.staff.get(id).await {
                    Ok(s) => print_staff_table(std::slice::from_ref(&s)),
                    Err(e) => report(&e),
                }
            }
        }
        Command::StaffCreate { name, email, password, role, phone } => {
            let role = match role.parse() {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("{}", e);
                    return Ok(());
                }
            };
            if ensure_staff_admin(ctx).await {
                let data = CreateStaff { name, email, password, role, phone };
                match ctx.staff.create(&data).await {
                    Ok(s) => println!("created staff #{} {} ({})", s.id, s.name, s.role),
                    Err(e) => report(&e),
                }
            }
        }
        Command::StaffStatus { id, update } => {
            if ensure_staff_admin(ctx).await {
                let data = UpdateStaffStatus { is_active: update.is_active, can_login: update.can_login };
                match ctx.staff.update_status(id, &data).await {
                    Ok(s) => println!("staff #{} active={} can_login={}", s.id, s.is_active, s.can_login),
                    Err(e) => report(&e),
                }
            }
        }
    }
    Ok(())
}

/// Line-oriented interpreter over the same commands.
pub fn run_repl(rt: &tokio::runtime::Runtime, ctx: &ClientContext) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    println!("serveline interpreter. Type 'help' for commands, 'quit' to exit.");
    loop {
        print!("{}> ", prompt_for(ctx.session.status()));
        stdout.flush()?;
        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 { break; }
        let line = input.trim();
        if line.is_empty() { continue; }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") { break; }
        let args: Vec<String> = line.split_whitespace().map(|s| s.to_string()).collect();
        match parse_command(&args) {
            Ok(Command::Repl) => println!("already in interactive mode"),
            Ok(cmd) => rt.block_on(run_command(ctx, cmd))?,
            Err(msg) => eprintln!("{}", msg),
        }
    }
    Ok(())
}

fn prompt_for(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Authenticated => "serveline",
        SessionStatus::Authenticating => "serveline(...)",
        SessionStatus::Expired => "serveline(expired)",
        SessionStatus::Anonymous => "serveline(anon)",
    }
}
