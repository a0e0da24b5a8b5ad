use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use provider_api::TransportConfig;
use session_dump::{generate_dump_path, write_dump};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use synergy::app::{Session, ENV_FORCE_AUTODUMP};
use synergy::commands::{self, Command, Outcome};

const USAGE: &str = "Usage:\n  synergy\n  synergy --model <shortname>\n  synergy --load <dump-file>";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct StartupOptions {
    model: Option<String>,
    load: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    install_sigint_handler();

    let options = parse_startup_options(std::env::args().skip(1))?;
    let cwd = std::env::current_dir().map_err(io::Error::other)?;
    let root = Session::discover_root(&cwd);
    let config = TransportConfig::from_env();

    let mut session = Session::new(root);
    let stdout = io::stdout();

    if let Some(model) = &options.model {
        session.models.set_active(model).map_err(io::Error::other)?;
    }
    if let Some(path) = &options.load {
        commands::execute(
            Command::Load(path.display().to_string()),
            &mut session,
            &config,
            &mut stdout.lock(),
        );
    }

    let interactive = io::stdin().is_terminal();
    tracing::debug!(session_id = %session.session_id, interactive, "session started");

    run_repl(&mut session, &config, interactive)?;

    if interactive || env_flag(ENV_FORCE_AUTODUMP) {
        autodump(&session, &mut stdout.lock());
    }

    Ok(())
}

fn run_repl(
    session: &mut Session,
    config: &TransportConfig,
    interactive: bool,
) -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut line = String::new();

    loop {
        if interactive {
            let mut out = stdout.lock();
            write!(out, "> ")?;
            out.flush()?;
        }

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return Ok(()),
            Ok(_) => {}
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {
                // ctrl-C at the prompt: fresh line, keep the session.
                let mut out = stdout.lock();
                writeln!(out)?;
                continue;
            }
            Err(error) => return Err(error),
        }

        let command = commands::parse_line(&line);
        let outcome = commands::execute(command, session, config, &mut stdout.lock());
        if outcome == Outcome::Exit {
            return Ok(());
        }
    }
}

/// Exit-time snapshot to a freshly generated filename, distinct from any
/// explicit dump written during the session.
fn autodump(session: &Session, out: &mut impl Write) {
    let path = generate_dump_path(&session.root, &session.session_id);
    match write_dump(&session.to_dump(), &path) {
        Ok(()) => {
            let _ = writeln!(out, "Dumped conversation to '{}'.", path.display());
        }
        Err(error) => {
            let _ = writeln!(out, "ERROR: {error}");
        }
    }
}

fn parse_startup_options(args: impl IntoIterator<Item = String>) -> io::Result<StartupOptions> {
    let mut options = StartupOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--model" => {
                let model = args.next().ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("Missing required value for --model\n{USAGE}"),
                    )
                })?;
                options.model = Some(model);
            }
            "--load" => {
                let path = args.next().ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("Missing required value for --load\n{USAGE}"),
                    )
                })?;
                options.load = Some(PathBuf::from(path));
            }
            unknown => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Unknown argument: {unknown}\n{USAGE}"),
                ));
            }
        }
    }

    Ok(options)
}

fn env_flag(key: &str) -> bool {
    match std::env::var(key) {
        Ok(value) => {
            let value = value.trim();
            !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
        }
        Err(_) => false,
    }
}

/// Install a no-op SIGINT handler without `SA_RESTART`.
///
/// A ctrl-C while blocked in `read_line` then surfaces as `Interrupted` and
/// the REPL returns to its prompt. Child processes (curl, `,exec` tools)
/// reset handled signals to the default on exec, so an in-flight transfer
/// still dies with the keyboard interrupt and is reported as a transport
/// failure.
fn install_sigint_handler() {
    extern "C" fn on_sigint(_signal: libc::c_int) {}
    let handler: extern "C" fn(libc::c_int) = on_sigint;

    // SAFETY: sigaction with a zeroed mask and a handler that touches no
    // shared state; called once before any other thread exists.
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as libc::sighandler_t;
        libc::sigemptyset(&mut action.sa_mask);
        action.sa_flags = 0;
        libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut());
    }
}
