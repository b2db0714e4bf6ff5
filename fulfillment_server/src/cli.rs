use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 18] = [
        "RUST_LOG",
        "FM_HOST",
        "FM_PORT",
        "FM_DATABASE_URL",
        "FM_USE_X_FORWARDED_FOR",
        "FM_USE_FORWARDED",
        "FM_CURRENCY",
        "FM_EVENT_BUFFER_SIZE",
        "FM_NOTIFIER_URL",
        "FM_WEBHOOK_HMAC_CHECKS",
        "FM_WEBHOOK_HMAC_HEADER",
        "FM_WEBHOOK_IP_WHITELIST",
        "FM_MOMO_BASE_URL",
        "FM_MOMO_API_USER",
        "FM_MOMO_CALLBACK_HOST",
        "FM_MOMO_TARGET_ENVIRONMENT",
        "FM_MOMO_TIMEOUT_SECS",
        "FM_MOMO_TOKEN_MARGIN_SECS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
