use crate::DEFAULT_CLIENT_ROOT;
use crate::action::cache::LocalCache;
use crate::action::delete_file::delete_file;
use crate::action::get_file::{GetOutcome, get_file};
use crate::action::put_file::put_file;
use crate::error::ClientError;
use crate::format::{u64_to_human_readable, unix_to_human_readable};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use ferry_wire::{Command, FileName};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "ferry-client",
    version,
    about = "Fetch, upload or delete one file on a ferry server",
    override_usage = "ferry-client <IP> <PORT> <GET|PUT|DELETE> <FILENAME> [--root <DIR>]",
    after_help = "Examples:\n  ferry-client 127.0.0.1 8080 GET test.txt\n  ferry-client 127.0.0.1 8080 PUT myfile.txt\n  ferry-client 127.0.0.1 8080 DELETE oldfile.txt"
)]
pub struct Cli {
    /// Server address
    pub ip: IpAddr,

    /// Server port
    pub port: u16,

    /// GET, PUT or DELETE
    pub command: String,

    /// File name, relative to the local root
    pub filename: String,

    /// Local directory mirroring server files
    #[arg(long, default_value = DEFAULT_CLIENT_ROOT)]
    pub root: PathBuf,
}

fn print_usage() {
    let _ = Cli::command().print_help();
    println!();
}

/// Parse the command line. Missing arguments print the usage and exit 0.
pub fn parse_or_exit() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::MissingRequiredArgument
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                print_usage();
                std::process::exit(0);
            }
            _ => e.exit(),
        },
    }
}

/// Run one request and print the outcome. Returns the process exit code.
pub fn run(cli: &Cli) -> i32 {
    let Ok(command) = cli.command.parse::<Command>() else {
        println!("Unknown command: {}", cli.command);
        print_usage();
        return 1;
    };
    let name = match FileName::new(cli.filename.as_str()) {
        Ok(name) => name,
        Err(e) => {
            println!("Rejected filename: {}", e);
            return 1;
        }
    };
    let cache = match LocalCache::open(&cli.root) {
        Ok(cache) => cache,
        Err(e) => {
            println!("{}", e);
            return 1;
        }
    };
    let server = SocketAddr::new(cli.ip, cli.port);

    let result = match command {
        Command::Get => handle_get(server, &cache, &name),
        Command::Put => handle_put(server, &cache, &name),
        Command::Delete => handle_delete(server, &name),
    };
    if let Err(e) = result {
        println!("{}", e);
    }
    0
}

fn handle_get(server: SocketAddr, cache: &LocalCache, name: &FileName) -> Result<(), ClientError> {
    let fetched = get_file(server, cache, name)?;
    if fetched.client_mtime > 0 {
        println!(
            "Local copy exists (modified: {})",
            unix_to_human_readable(fetched.client_mtime)
        );
    }
    println!("Status: {}", fetched.header.status_line());
    match fetched.outcome {
        GetOutcome::Downloaded { path, meta } => {
            println!("File size: {}", u64_to_human_readable(meta.size));
            println!("Modified: {}", unix_to_human_readable(meta.mtime));
            println!("Downloaded {} ({} bytes)", path.display(), meta.size);
        }
        GetOutcome::UpToDate => println!("Local file is up to date"),
        GetOutcome::NotServed => {}
    }
    Ok(())
}

fn handle_put(server: SocketAddr, cache: &LocalCache, name: &FileName) -> Result<(), ClientError> {
    let uploaded = put_file(server, cache, name)?;
    println!("Sent {} bytes", uploaded.sent);
    println!("Status: {}", uploaded.header.status_line());
    Ok(())
}

fn handle_delete(server: SocketAddr, name: &FileName) -> Result<(), ClientError> {
    let header = delete_file(server, name)?;
    println!("Status: {}", header.status_line());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positional_arguments() {
        let cli = Cli::try_parse_from(["ferry-client", "127.0.0.1", "8080", "GET", "a.txt"]).unwrap();
        assert_eq!(cli.ip, "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.command, "GET");
        assert_eq!(cli.filename, "a.txt");
        assert_eq!(cli.root, PathBuf::from(DEFAULT_CLIENT_ROOT));
    }

    #[test]
    fn root_can_be_overridden() {
        let cli = Cli::try_parse_from([
            "ferry-client",
            "::1",
            "9000",
            "PUT",
            "b.bin",
            "--root",
            "/tmp/mirror",
        ])
        .unwrap();
        assert!(cli.ip.is_ipv6());
        assert_eq!(cli.root, PathBuf::from("/tmp/mirror"));
    }

    #[test]
    fn missing_arguments_are_reported_as_such() {
        let err = Cli::try_parse_from(["ferry-client", "127.0.0.1", "8080"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn unknown_command_exits_1_without_connecting() {
        let cli = Cli::try_parse_from(["ferry-client", "127.0.0.1", "1", "LIST", "a.txt"]).unwrap();
        assert_eq!(run(&cli), 1);
    }

    #[test]
    fn command_words_are_case_sensitive() {
        let cli = Cli::try_parse_from(["ferry-client", "127.0.0.1", "1", "get", "a.txt"]).unwrap();
        assert_eq!(run(&cli), 1);
    }
}
