use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use marchview_render::ShaderSources;
use marchview_render_wgpu::reflect;
use naga::ShaderStage;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for marchview")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, shaders
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Parse and validate the GLSL program, then list its uniforms
    Shaders {
        #[arg(long, default_value = "program")]
        dir: PathBuf,
    },
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests()?;
            run_shaders(Path::new("program"))?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => run_tests()?,
        Commands::Shaders { dir } => run_shaders(&dir)?,
        Commands::Doc => run_cargo("doc", &["doc", "--workspace", "--no-deps"])?,
        Commands::Build => run_cargo("build", &["build", "--workspace"])?,
    }

    Ok(())
}

fn run_cargo(what: &str, args: &[&str]) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {what} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    run_cargo("fmt check", &["fmt", "--all", "--", "--check"])
}

fn run_clippy() -> Result<()> {
    run_cargo(
        "clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

fn run_tests() -> Result<()> {
    run_cargo("test", &["test", "--workspace"])
}

fn run_shaders(dir: &Path) -> Result<()> {
    println!("==> Validating shaders in {}", dir.display());
    let sources = ShaderSources::load(dir, dir.join(ShaderSources::POST_FILE).exists())?;

    let mut stages = vec![
        (ShaderSources::VERTEX_FILE, &sources.vertex, ShaderStage::Vertex),
        (ShaderSources::FRAGMENT_FILE, &sources.fragment, ShaderStage::Fragment),
    ];
    if let Some(post) = &sources.post {
        stages.push((ShaderSources::POST_FILE, post, ShaderStage::Fragment));
    }
    for (file, src, stage) in stages {
        reflect::validate(src, stage).with_context(|| format!("{file} failed validation"))?;
        println!("    {file}: ok");
    }

    let layout = reflect::reflect_uniforms(&sources.fragment)?;
    println!("    uniform block: {} bytes", layout.size());
    for name in layout.names() {
        let location = layout.locate(name)?;
        let kind = format!("{:?}", location.kind());
        println!("      {:>4}  {kind:<6} {name}", location.offset());
    }
    Ok(())
}
