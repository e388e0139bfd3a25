use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shaderpack::config::DEFAULT_CONFIG_FILE;
use shaderpack::{GlslangBackend, ShaderCompiler, ToolConfig};

#[derive(Parser)]
#[command(name = "shaderpack")]
#[command(about = "Compile a shader tree into a single variant pack")]
struct Cli {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Project root (overrides `project_path`)
    #[arg(long)]
    project: Option<PathBuf>,

    /// Shader file suffix
    #[arg(long)]
    suffix: Option<String>,

    /// Vertex stage entry point
    #[arg(long)]
    vs_entry: Option<String>,

    /// Fragment stage entry point
    #[arg(long)]
    ps_entry: Option<String>,

    /// Pack file, relative to the asset directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Compiler executable
    #[arg(long)]
    compiler: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Compile every shader and write the pack (default)
    Build,

    /// Print the variants each shader expands to, without compiling
    Variants,
}

impl Cli {
    fn load_config(&self) -> Result<ToolConfig> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = match (&self.project, path.exists() || self.config.is_some()) {
            (_, true) => ToolConfig::load(&path)
                .with_context(|| format!("loading {}", path.display()))?,
            (Some(project), false) => ToolConfig::new(project),
            (None, false) => anyhow::bail!(
                "no {DEFAULT_CONFIG_FILE} found; pass --config or --project"
            ),
        };

        let settings = &mut config.shader_compiler;
        if let Some(project) = &self.project {
            config.project_path.clone_from(project);
        }
        if let Some(suffix) = &self.suffix {
            settings.shader_suffix.clone_from(suffix);
        }
        if let Some(entry) = &self.vs_entry {
            settings.vs_entry.clone_from(entry);
        }
        if let Some(entry) = &self.ps_entry {
            settings.ps_entry.clone_from(entry);
        }
        if let Some(output) = &self.output {
            settings.pack_file.clone_from(output);
        }
        if let Some(compiler) = &self.compiler {
            settings.compiler.clone_from(compiler);
        }
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;
    let backend = GlslangBackend::new(&config.shader_compiler.compiler);
    let compiler = ShaderCompiler::new(&config, backend);

    match cli.command.unwrap_or(Commands::Build) {
        Commands::Build => {
            compiler.run()?;
        }
        Commands::Variants => {
            for (unit, variants) in compiler.plan()? {
                println!("{} ({} variants)", unit.relative_path, variants.len());
                for variant in variants {
                    println!("    {variant}");
                }
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
