use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use image_redirector::{
    DecodedDescriptor, HostTemplate, ParamsDescriptor, RasterFormat, ServiceConfig,
    SuffixDescriptor, Variant,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "image-redirector", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve(ServiceConfig),
    /// Decode a single descriptor and print the result as JSON.
    Decode(DecodeArgs),
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Grammar to read the descriptor with.
    #[arg(long, value_enum)]
    variant: VariantChoice,

    descriptor: String,

    /// Bucket used to build suffix-grammar fallback URIs.
    #[arg(long, default_value = "bucket")]
    bucket: String,

    #[arg(long, default_value = "us-east-1")]
    region: String,

    #[arg(long, default_value = "s3-website")]
    s3_endpoint: String,

    #[arg(long, default_value = "https")]
    endpoint_scheme: String,

    /// Host used to build params-grammar fallback URIs.
    #[arg(long, default_value = "localhost")]
    redirect_host: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VariantChoice {
    Suffix,
    Params,
}

impl From<VariantChoice> for Variant {
    fn from(choice: VariantChoice) -> Self {
        match choice {
            VariantChoice::Suffix => Variant::Suffix,
            VariantChoice::Params => Variant::Params,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Serve(config) => cmd_serve(config).await,
        Command::Decode(args) => cmd_decode(&args),
    }
}

async fn cmd_serve(config: ServiceConfig) -> anyhow::Result<()> {
    image_redirector::serve(config)
        .await
        .context("serve image redirector")
}

fn cmd_decode(args: &DecodeArgs) -> anyhow::Result<()> {
    let variant = Variant::from(args.variant);
    let descriptor = args.descriptor.as_str();

    let report = match variant {
        Variant::Suffix => {
            let hosts = HostTemplate::S3Website {
                scheme: args.endpoint_scheme.clone(),
                bucket: args.bucket.clone(),
                endpoint: args.s3_endpoint.clone(),
                region: args.region.clone(),
            };
            let decoded = SuffixDescriptor::decode(descriptor, &hosts)
                .with_context(|| format!("decode suffix descriptor '{descriptor}'"))?;
            decode_report(variant, descriptor, &hosts, &decoded)?
        }
        Variant::Params => {
            let hosts = HostTemplate::RedirectHost {
                host: args.redirect_host.clone(),
            };
            let decoded = ParamsDescriptor::decode(descriptor, &hosts)
                .with_context(|| format!("decode params descriptor '{descriptor}'"))?;
            decode_report(variant, descriptor, &hosts, &decoded)?
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize decode report")?
    );
    Ok(())
}

fn decode_report<D>(
    variant: Variant,
    descriptor: &str,
    hosts: &HostTemplate,
    decoded: &D,
) -> anyhow::Result<serde_json::Value>
where
    D: DecodedDescriptor + serde::Serialize,
{
    // Assumes the source bytes are in the format the key names.
    let declared = decoded
        .identity()
        .format()
        .with_context(|| format!("no raster format for '{descriptor}'"))?;
    let output: RasterFormat = decoded.params().conversion.resolve(declared, declared);
    let destination_key = decoded.destination_key(declared, output);

    Ok(serde_json::json!({
        "variant": variant,
        "descriptor": descriptor,
        "decoded": decoded,
        "destination_key": destination_key,
        "destination_uri": hosts.build_uri(&destination_key),
        "content_type": decoded.content_type(output),
    }))
}
