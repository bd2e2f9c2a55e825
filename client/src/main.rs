use ferry_client::cli;

fn main() {
    let cli = cli::parse_or_exit();
    std::process::exit(cli::run(&cli));
}
