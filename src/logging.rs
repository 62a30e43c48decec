use chrono::Local;
use std::io::Write;

/// Default filter per `-v` count; HTTP internals stay quiet unless RUST_LOG says otherwise
fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info,reqwest=warn,hyper=warn",
        _ => "debug,reqwest=warn,hyper=warn",
    }
}

/// Initialize the stderr logger. `RUST_LOG` overrides the verbosity flags.
pub fn init(verbosity: u8) {
    let env = env_logger::Env::default().default_filter_or(default_filter(verbosity));

    let _ = env_logger::Builder::from_env(env)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();
}
