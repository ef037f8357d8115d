use crate::CLAP_STYLING;
use clap::{arg, command};
use relmap_core::crawl::DEFAULT_ROOT_PATH;
use relmap_scanner::link::{DEFAULT_DOWNLOAD_MARKERS, DEFAULT_PRIMARY_VERSION};
use relmap_scanner::path::DEFAULT_TYPE_LITERALS;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("relmap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("relmap")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Follow the hypermedia links of an API and map its resource types. Reads \
                the API host from CF_API and the token from CF_TOKEN.",
                )
                .arg(
                    arg!(-r --"root" <PATH>)
                        .required(false)
                        .help("API path to start crawling from")
                        .default_value(DEFAULT_ROOT_PATH),
                )
                .arg(
                    arg!(--"primary-version" <SEGMENT>)
                        .required(false)
                        .help("Path segment marking the API version to follow")
                        .default_value(DEFAULT_PRIMARY_VERSION),
                )
                .arg(
                    arg!(--"type-literal" <SEGMENT>)
                        .required(false)
                        .help("Path segment treated as a per-instance type discriminator (repeatable)")
                        .action(clap::ArgAction::Append)
                        .default_values(DEFAULT_TYPE_LITERALS.iter().copied()),
                )
                .arg(
                    arg!(--"download-marker" <SEGMENT>)
                        .required(false)
                        .help("Path segment marking binary downloads that are never fetched (repeatable)")
                        .action(clap::ArgAction::Append)
                        .default_values(DEFAULT_DOWNLOAD_MARKERS.iter().copied()),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, dot, markdown")
                        .value_parser(["text", "json", "dot", "markdown"])
                        .default_value("text"),
                )
                .arg(
                    arg!(--"trace")
                        .required(false)
                        .help("Print the traversal trace to stderr")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
