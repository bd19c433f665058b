//! strata cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the merged configuration
    Show(ShowCommand),

    /// Resolve one section item, e.g. `providers.github`
    Get(GetCommand),

    /// Explain which proxy an item uses
    Proxy(ProxyCommand),

    /// Compute auth, proxy, network and config of an item
    Compute(ComputeCommand),

    /// Resolve placeholders in a text
    #[command(alias = "tpl")]
    Template(TemplateCommand),
}

#[derive(Parser, Debug)]
pub struct ShowCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Include how the documents were loaded
    #[clap(long = "load-result")]
    pub load_result: bool,
}

#[derive(Parser, Debug)]
pub struct GetCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Print the item as written, without environment resolution
    #[clap(long = "raw")]
    pub raw: bool,

    /// `<type>.<name>` with type one of providers, services, storages
    pub path: String,
}

#[derive(Parser, Debug)]
pub struct ProxyCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Environment used for the global proxy table (defaults to the active one)
    #[clap(long = "proxy-env")]
    pub proxy_environment: Option<String>,

    /// Force a proxy url
    #[clap(long = "proxy-url", conflicts_with("no_proxy"))]
    pub proxy_url: Option<String>,

    /// Force no proxy
    #[clap(long = "no-proxy")]
    pub no_proxy: bool,

    /// `<type>.<name>` with type one of providers, services, storages
    pub path: String,
}

#[derive(Parser, Debug)]
pub struct ComputeCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    #[clap(flatten)]
    pub request: RequestArgs,

    /// `<type>.<name>` with type one of providers, services, storages
    pub path: String,
}

#[derive(Parser, Debug)]
pub struct TemplateCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub request: RequestArgs,

    /// Text with `{{path}}` or `$.path` placeholders
    pub text: String,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Load a file, merged in the order given
    ///
    /// May contain `{APP_ENV}`. For `name.ext` the file `name.<env>.ext` is preferred when it exists.
    #[clap(short = 'f', long = "file", required(true))]
    pub files: Vec<String>,

    /// Resolve relative files against this directory
    #[clap(short = 'd', long = "config-dir")]
    pub config_dir: Option<PathBuf>,

    /// Active environment, overrides APP_ENV
    #[clap(short = 'e', long = "env")]
    pub environment: Option<String>,
}

#[derive(Parser, Debug)]
pub struct RequestArgs {
    /// Simulate an inbound request header, `name=value`
    #[clap(short = 'H', long = "header", value_parser = parse_pair)]
    pub headers: Vec<(String, String)>,

    /// Simulate an inbound query parameter, `name=value`
    #[clap(short = 'Q', long = "query", value_parser = parse_pair)]
    pub query: Vec<(String, String)>,
}

fn parse_pair(pair: &str) -> Result<(String, String), String> {
    pair.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{pair}'"))
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
