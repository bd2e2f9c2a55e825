use std::net::IpAddr;
use std::path::PathBuf;
use structopt::StructOpt;

/// Command-line options for the server.
///
/// Examples:
/// - Serve ./server_files on port 8080:
///   ferry-server 8080
/// - Take everything from a config file, overriding the root:
///   ferry-server -c ferry.toml --root /srv/files
///
/// Command-line values win over the config file.
#[derive(StructOpt, Debug)]
#[structopt(name = "ferry-server", about = "Serve GET/PUT/DELETE file transfers over TCP")]
pub struct Opts {
    #[structopt(short = "v", long = "version")]
    pub version: bool,

    #[structopt(short, long, help = "Enable debug mode (verbose logging)")]
    pub debug: bool,

    #[structopt(short = "c", long = "config", help = "Path to a TOML configuration file.")]
    pub config: Option<PathBuf>,

    #[structopt(long, help = "Directory holding the served files [default: ./server_files]")]
    pub root: Option<PathBuf>,

    #[structopt(long, help = "Address to listen on [default: 0.0.0.0]")]
    pub bind: Option<IpAddr>,

    #[structopt(long = "log-file", help = "Append the operator log to this file instead of stdout")]
    pub log_file: Option<PathBuf>,

    #[structopt(
        long = "max-connections",
        help = "Bound on concurrently served connections, 0 for unbounded"
    )]
    pub max_connections: Option<usize>,

    #[structopt(name = "PORT", help = "TCP port to listen on")]
    pub port: Option<u16>,
}

impl Opts {
    /// Parse CLI arguments. On a parse failure, or when neither a port nor a
    /// config file is given, print the usage and exit 0.
    pub fn from_args() -> Self {
        let app = Opts::clap();
        match app.get_matches_safe() {
            Ok(m) => {
                let opts = Opts::from_clap(&m);
                if !opts.version && opts.port.is_none() && opts.config.is_none() {
                    Self::usage_and_exit(None);
                }
                opts
            }
            Err(e) => Self::usage_and_exit(Some(e)),
        }
    }

    fn usage_and_exit(err: Option<structopt::clap::Error>) -> ! {
        if let Some(e) = err {
            eprintln!("{}", e);
            eprintln!();
        }
        let _ = Opts::clap().print_long_help();
        eprintln!();
        std::process::exit(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parse_port_only() {
        let o = Opts::from_iter_safe(["ferry-server", "8080"]).expect("parse");
        assert_eq!(o.port, Some(8080));
        assert!(!o.version);
        assert!(!o.debug);
        assert!(o.config.is_none());
        assert!(o.root.is_none());
        assert!(o.max_connections.is_none());
    }

    #[test]
    fn parse_version_flag() {
        let o = Opts::from_iter_safe(["ferry-server", "--version"]).expect("parse");
        assert!(o.version);
        assert!(o.port.is_none());
    }

    #[test]
    fn parse_all_overrides() {
        let o = Opts::from_iter_safe([
            "ferry-server",
            "-d",
            "-c",
            "/tmp/ferry.toml",
            "--root",
            "/srv/files",
            "--bind",
            "127.0.0.1",
            "--log-file",
            "/tmp/ferry.log",
            "--max-connections",
            "16",
            "9000",
        ])
        .expect("parse");
        assert!(o.debug);
        assert_eq!(o.config.as_deref(), Some(Path::new("/tmp/ferry.toml")));
        assert_eq!(o.root.as_deref(), Some(Path::new("/srv/files")));
        assert_eq!(o.bind, Some("127.0.0.1".parse().unwrap()));
        assert_eq!(o.log_file.as_deref(), Some(Path::new("/tmp/ferry.log")));
        assert_eq!(o.max_connections, Some(16));
        assert_eq!(o.port, Some(9000));
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(Opts::from_iter_safe(["ferry-server", "eighty"]).is_err());
        assert!(Opts::from_iter_safe(["ferry-server", "70000"]).is_err());
    }

    #[test]
    fn rejects_bad_bind_address() {
        assert!(Opts::from_iter_safe(["ferry-server", "--bind", "localhost", "8080"]).is_err());
    }
}
