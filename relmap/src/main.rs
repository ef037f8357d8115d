use relmap::commands::command_argument_builder;
use relmap::handlers::handle_crawl;
use relmap_core::print_banner;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handle_crawl(primary_command, quiet).await,
        None => {}
        _ => unreachable!("clap should ensure we don't get here"),
    }
}
