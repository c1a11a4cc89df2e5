use colored::Colorize;
use lumen::commands::command_argument_builder;
use lumen::handlers::{
    handle_init, handle_list, handle_report, handle_scan, handle_user_register, print_banner,
};

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("user", primary_command)) => match primary_command.subcommand() {
            Some(("register", secondary_command)) => handle_user_register(secondary_command),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("scan", primary_command)) => match handle_scan(primary_command).await {
            Ok(true) => Ok(()),
            Ok(false) => std::process::exit(2),
            Err(e) => Err(e),
        },
        Some(("report", primary_command)) => handle_report(primary_command),
        Some(("list", primary_command)) => handle_list(primary_command),
        // No subcommand provided, just show the banner
        _ => return,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
