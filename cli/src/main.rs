use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Once;

use hdi_gen_compiler::{run, BuildTarget, DumpFormat, HdiError, Language, Options, PackageRoot};

static TRACING_INIT: Once = Once::new();

/// Logging stays silent unless `RUST_LOG` is set.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

#[derive(Parser)]
#[command(name = "hdi-gen", version)]
#[command(about = "Compile HDI interface definitions into C, C++ or Java marshalling code", long_about = None)]
struct Cli {
    /// `.idl` files to compile; their imports are found through the root mappings
    #[arg(short = 'c', long = "compile", value_name = "IDL_FILE", num_args = 1.., required = true)]
    sources: Vec<PathBuf>,

    /// Output directory; files land under `<dir>/<package path>/`
    #[arg(short = 'd', long = "out-dir", value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Package root mapping, e.g. `ohos.hdi:./idl`
    #[arg(short = 'r', long = "root", value_name = "PACKAGE:PATH")]
    roots: Vec<PackageRoot>,

    /// Generate C code
    #[arg(long)]
    gen_c: bool,

    /// Generate C++ code
    #[arg(long)]
    gen_cpp: bool,

    /// Generate Java code (client side only)
    #[arg(long)]
    gen_java: bool,

    /// Generate kernel-mode C
    #[arg(long)]
    kernel: bool,

    /// Which side to generate: client, server or all
    #[arg(long, value_name = "TARGET", default_value = "all")]
    build_target: BuildTarget,

    /// Service and driver module name
    #[arg(long, value_name = "NAME")]
    module_name: Option<String>,

    /// Print `<file>:<sha256>` for each input and exit
    #[arg(long)]
    gen_hash: bool,

    /// Print the compiled AST before generating
    #[arg(long)]
    dump_ast: bool,

    /// Format of `--dump-ast`: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    dump_format: DumpFormat,
}

impl Cli {
    fn into_options(self) -> Result<Options, HdiError> {
        Ok(Options {
            language:     Language::from_flags(self.gen_c, self.gen_cpp, self.gen_java)?,
            sources:      self.sources,
            out_dir:      self.out_dir,
            roots:        self.roots,
            kernel:       self.kernel,
            build_target: self.build_target,
            module_name:  self.module_name,
            gen_hash:     self.gen_hash,
            dump_ast:     self.dump_ast,
            dump_format:  self.dump_format,
        })
    }
}

fn report(err: &HdiError) {
    match err {
        HdiError::Compile(diagnostics) => {
            for diagnostic in diagnostics {
                eprintln!("{}", diagnostic);
            }
            eprintln!("{} error(s), nothing generated", diagnostics.len());
        }
        other => eprintln!("error: {}", other),
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = cli.into_options().and_then(|options| run(&options));
    match result {
        Ok(output) => {
            for line in &output.hashes {
                println!("{}", line);
            }
            if let Some(dump) = &output.dump {
                println!("{}", dump);
            }
            tracing::info!(files = output.written.len(), "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}
