mod cli;

use std::sync::Arc;
use strata::context::RequestContext;
use strata::documents::{DocumentStore, LoadSpec};
use strata::env::EnvChainResolver;
use strata::factory::{ComputeOptions, ConfigFactory, ConfigPath};
use strata::proxy::ProxyOverride;

#[tokio::main]
async fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("STRATA_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let command_result = match cli.command {
        cli::Command::Show(show_cli) => show(show_cli),
        cli::Command::Get(get_cli) => get(get_cli),
        cli::Command::Proxy(proxy_cli) => proxy(proxy_cli),
        cli::Command::Compute(compute_cli) => compute(compute_cli).await,
        cli::Command::Template(template_cli) => template(template_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn show(cli: cli::ShowCommand) -> anyhow::Result<()> {
    let store = load(&cli.input)?;

    if cli.load_result {
        return output(&cli.output, &store.load_result());
    }
    output(&cli.output, store.data())
}

pub fn get(cli: cli::GetCommand) -> anyhow::Result<()> {
    let factory = factory(&cli.input)?;
    let path = ConfigPath::parse(&cli.path)?;
    let section = factory.section(path.kind);

    if cli.raw {
        let item = section
            .raw(&path.name)
            .ok_or_else(|| (section.spec().not_found)(&path.name))?;
        return output(&cli.output, item);
    }

    let resolved = section.get(&path.name, None)?;
    output(&cli.output, &resolved)
}

pub fn proxy(cli: cli::ProxyCommand) -> anyhow::Result<()> {
    let factory = factory(&cli.input)?;

    let proxy_override = match (cli.no_proxy, cli.proxy_url) {
        (true, _) => Some(ProxyOverride::Disabled),
        (false, Some(url)) => Some(ProxyOverride::Url(url)),
        (false, None) => None,
    };

    let resolution = factory.compute_proxy(
        &cli.path,
        cli.proxy_environment.as_deref(),
        proxy_override.as_ref(),
    )?;
    output(&cli.output, &resolution)
}

pub async fn compute(cli: cli::ComputeCommand) -> anyhow::Result<()> {
    let factory = factory(&cli.input)?;
    let request = request(&cli.request);

    let result = factory
        .compute(&cli.path, &ComputeOptions::all(), request.as_ref())
        .await?;
    output(&cli.output, &result)
}

pub fn template(cli: cli::TemplateCommand) -> anyhow::Result<()> {
    let factory = factory(&cli.input)?;
    let request = request(&cli.request);

    println!("{}", factory.render(&cli.text, request.as_ref())?);
    Ok(())
}

fn load(input: &cli::InputArgs) -> anyhow::Result<DocumentStore> {
    let mut spec = LoadSpec::new(input.files.iter().cloned());
    if let Some(config_dir) = &input.config_dir {
        spec = spec.base_dir(config_dir);
    }
    if let Some(environment) = &input.environment {
        spec = spec.environment(environment);
    }

    let mut store = DocumentStore::new();
    let result = store.load(&spec)?;
    for issue in &result.errors {
        tracing::warn!(file = %issue.file.display(), "{}", issue.error);
    }

    Ok(store)
}

fn factory(input: &cli::InputArgs) -> anyhow::Result<ConfigFactory> {
    let store = load(input)?;
    Ok(ConfigFactory::new(Arc::new(store), EnvChainResolver::default()))
}

/// `None` unless at least one header or query parameter was given
fn request(args: &cli::RequestArgs) -> Option<RequestContext> {
    if args.headers.is_empty() && args.query.is_empty() {
        return None;
    }

    let request = args
        .headers
        .iter()
        .fold(RequestContext::new(), |request, (name, value)| request.header(name, value));
    Some(
        args.query
            .iter()
            .fold(request, |request, (name, value)| request.query(name, value)),
    )
}

fn output<T: serde::Serialize + ?Sized>(output: &cli::OutputArgs, value: &T) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}
