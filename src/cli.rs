use crate::{api::Client, session::Session, transcript::Transcript, Args};
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::io::{self, Write};

pub struct Context {
    pub args: Args,
    pub api: Client,
    pub session: RefCell<Session>,
    pub transcript: RefCell<Transcript>,
    pub session_id: String,
    pub auto_yes: bool,
}

/// One-shot mode: run a single REPL line and exit.
pub fn run_once(ctx: &Context, line: &str) -> Result<()> {
    let line = line.trim();
    if line.starts_with('/') {
        handle_command(ctx, line);
    } else if !line.is_empty() {
        add_task(ctx, line);
    }
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("tdo - type /help for commands, /exit to quit");

    loop {
        let prompt = {
            let session = ctx.session.borrow();
            if session.user_created {
                format!("{}> ", session.username)
            } else {
                "tdo> ".to_string()
            }
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if line.starts_with('/') {
                    if handle_command(&ctx, line) {
                        break;
                    }
                    continue;
                }

                // Any other input is a new task label.
                add_task(&ctx, line);
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Returns true when the REPL should exit.
fn handle_command(ctx: &Context, cmd: &str) -> bool {
    let parts: Vec<&str> = cmd.splitn(2, ' ').collect();
    let arg = if parts.len() > 1 { parts[1].trim() } else { "" };

    match parts[0] {
        "/exit" | "/quit" => return true,
        "/help" => {
            println!("Commands:");
            println!("  /user <name>    - create a user on the service and sign in");
            println!("  /open <name>    - sign in as an existing user");
            println!("  /list           - re-fetch and print the task list");
            println!("  /rm <id>        - delete one task by id");
            println!("  /clear          - delete every task (asks first)");
            println!("  /drop           - delete the current user (asks first)");
            println!("  /session        - show session info");
            println!("  /exit           - quit");
            println!("Anything not starting with '/' is added as a new task.");
        }
        "/session" => {
            println!("Session: {}", ctx.session_id);
            println!("Transcript: {:?}", ctx.transcript.borrow().path);
            let session = ctx.session.borrow();
            if session.user_created {
                println!("User: {}", session.username);
            } else {
                println!("User: <none>");
            }
        }
        "/user" => {
            if arg.is_empty() {
                println!("Usage: /user <name>");
            } else {
                create_user(ctx, arg);
            }
        }
        "/open" => {
            if arg.is_empty() {
                println!("Usage: /open <name>");
            } else {
                open_existing(ctx, arg);
            }
        }
        "/list" => list_tasks(ctx),
        "/rm" => match arg.parse::<u64>() {
            Ok(id) => delete_task(ctx, id),
            Err(_) => println!("Usage: /rm <id>"),
        },
        "/clear" => clear_all(ctx),
        "/drop" => delete_user(ctx),
        _ => println!("Unknown command: {}", parts[0]),
    }
    false
}

/// Startup sign-in for --user / config: open the user if it already
/// exists, otherwise create it.
pub fn open_user(ctx: &Context, name: &str) {
    let mut session = ctx.session.borrow_mut();
    match session.open_user(&ctx.api, name) {
        Ok(()) if session.user_created => {
            let _ = ctx.transcript.borrow_mut().user_open(&session.username);
            print_tasks(&session);
        }
        Ok(()) => {}
        Err(_) => match session.create_user(&ctx.api, name) {
            Ok(()) if session.user_created => {
                let _ = ctx.transcript.borrow_mut().user_create(&session.username);
                println!("User \"{}\" created.", session.username);
            }
            Ok(()) => {}
            Err(e) => report(ctx, "create_user", e),
        },
    }
}

fn create_user(ctx: &Context, name: &str) {
    let mut session = ctx.session.borrow_mut();
    match session.create_user(&ctx.api, name) {
        Ok(()) if session.user_created => {
            let _ = ctx.transcript.borrow_mut().user_create(&session.username);
            println!("User \"{}\" created.", session.username);
            print_tasks(&session);
        }
        Ok(()) => {}
        Err(e) => report(ctx, "create_user", e),
    }
}

fn open_existing(ctx: &Context, name: &str) {
    let mut session = ctx.session.borrow_mut();
    match session.open_user(&ctx.api, name) {
        Ok(()) if session.user_created => {
            let _ = ctx.transcript.borrow_mut().user_open(&session.username);
            print_tasks(&session);
        }
        Ok(()) => {}
        Err(e) => report(ctx, "open_user", e),
    }
}

fn list_tasks(ctx: &Context) {
    let mut session = ctx.session.borrow_mut();
    if !require_user(&session) {
        return;
    }
    match session.load_tasks(&ctx.api) {
        Ok(()) => {
            let _ = ctx.transcript.borrow_mut().tasks_load(session.tasks.len());
            print_tasks(&session);
        }
        Err(e) => report(ctx, "load_tasks", e),
    }
}

fn add_task(ctx: &Context, label: &str) {
    let mut session = ctx.session.borrow_mut();
    if !require_user(&session) {
        return;
    }
    match session.add_task(&ctx.api, label) {
        Ok(()) => {
            let _ = ctx.transcript.borrow_mut().task_add(label.trim());
            print_tasks(&session);
        }
        Err(e) => report(ctx, "add_task", e),
    }
}

fn delete_task(ctx: &Context, id: u64) {
    let mut session = ctx.session.borrow_mut();
    if !require_user(&session) {
        return;
    }
    match session.delete_task(&ctx.api, id) {
        Ok(()) => {
            let _ = ctx.transcript.borrow_mut().task_delete(id);
            print_tasks(&session);
        }
        Err(e) => report(ctx, "delete_task", e),
    }
}

fn clear_all(ctx: &Context) {
    let mut session = ctx.session.borrow_mut();
    if !require_user(&session) {
        return;
    }
    if session.tasks.is_empty() {
        println!("Nothing to clear.");
        return;
    }
    let count = session.tasks.len();
    let prompt = format!("Delete all {} tasks for \"{}\"?", count, session.username);
    if !confirm(ctx, &prompt) {
        return;
    }
    match session.clear_all(&ctx.api) {
        Ok(()) => {
            let _ = ctx.transcript.borrow_mut().clear_all(count);
            print_tasks(&session);
        }
        Err(e) => report(ctx, "clear_all", e),
    }
}

fn delete_user(ctx: &Context) {
    let mut session = ctx.session.borrow_mut();
    if !require_user(&session) {
        return;
    }
    let name = session.username.clone();
    if !confirm(ctx, &format!("Delete user \"{}\"?", name)) {
        return;
    }
    match session.delete_user(&ctx.api) {
        Ok(()) => {
            let _ = ctx.transcript.borrow_mut().user_delete(&name);
            println!("User \"{}\" deleted.", name);
        }
        Err(e) => report(ctx, "delete_user", e),
    }
}

fn require_user(session: &Session) -> bool {
    if session.user_created {
        return true;
    }
    println!("No user yet. Use /user <name> to create one, or /open <name>.");
    false
}

fn confirm(ctx: &Context, prompt: &str) -> bool {
    if ctx.auto_yes {
        return true;
    }

    print!("{} [y/N]: ", prompt);
    io::stdout().flush().ok();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        let input = input.trim().to_lowercase();
        input == "y" || input == "yes"
    } else {
        false
    }
}

fn print_tasks(session: &Session) {
    if session.tasks.is_empty() {
        println!("No tasks. Type one to add it.");
        return;
    }
    println!("{} task(s) for {}:", session.tasks.len(), session.username);
    for task in &session.tasks {
        let mark = if task.is_done { "x" } else { " " };
        println!("  [{}] #{:<5} {}", mark, task.id, task.label);
    }
}

/// Failures are reported on stderr and in the transcript; session state is
/// left as it was before the failed call.
fn report(ctx: &Context, op: &str, err: anyhow::Error) {
    eprintln!("Error: {}", err);
    let _ = ctx.transcript.borrow_mut().op_error(op, &err.to_string());
}
