use clap::{arg, command};

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/lumen/";

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("lumen")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("lumen")
        .about("Crawl a website and audit every page it reaches for accessibility issues")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(--"db" <PATH>)
                .required(false)
                .global(true)
                .help("Database file, or the directory holding lumen.db (default: ~/.config/lumen/)"),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the lumen database on your filesystem")
                .arg(
                    arg!([PATH]).required(false).help(
                        "Database file, or the directory to hold lumen.db (default: --db, then \
                        ~/.config/lumen/)",
                    ),
                )
                .arg(
                    arg!(-f - -"force")
                        .help(
                            "Forces the overwriting of any existing database at the specified \
                        location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("user")
                .about("Manage the users scans are run on behalf of")
                .subcommand_required(true)
                .subcommand(
                    command!("register").about("Registers a user").arg(
                        arg!(-e --"email" <EMAIL>)
                            .required(true)
                            .help("The user's email address"),
                    ),
                ),
        )
        .subcommand(
            command!("scan")
                .about(
                    "Crawl a website from a seed URL and audit each page reached. Stores the \
                per-page findings and the overall score.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The seed URL to start crawling from"),
                )
                .arg(
                    arg!(--"user" <EMAIL>)
                        .required(true)
                        .help("Email of the registered user requesting the scan"),
                )
                .arg(
                    arg!(-d --"max-depth" <DEPTH>)
                        .required(false)
                        .help("How many links away from the seed to follow")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("2"),
                )
                .arg(
                    arg!(-p --"max-pages" <PAGES>)
                        .required(false)
                        .help("Upper bound on the number of pages audited")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(-c --"concurrency" <NUM_PAGES>)
                        .required(false)
                        .help("Pages audited at the same time")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("3"),
                )
                .arg(
                    arg!(--"max-links" <LINKS>)
                        .required(false)
                        .help("Links followed per page")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"settle-ms" <MILLIS>)
                        .required(false)
                        .help("Pause after each page load before auditing")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("2000"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Page load timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("30"),
                )
                .arg(
                    arg!(-v --"verbose")
                        .required(false)
                        .help("Log every page visit and link decision")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("report")
                .about("Render the stored results of a scan")
                .arg(
                    arg!(-i --"id" <WEBSITE_ID>)
                        .required(true)
                        .help("Identifier printed when the scan finished (see `lumen list`)"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, markdown")
                        .value_parser(["text", "json", "markdown"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
        .subcommand(command!("list").about("List stored scans, newest first"))
}
