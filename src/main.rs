/*!
Command-line front end for wb_runner.

| Command                  | Description                                                               |
| ------------------------ | ------------------------------------------------------------------------- |
| run <tool> [key=value]   | Validates the parameters and runs a tool, streaming its output.           |
| list-tools [keywords]    | Lists the available tools, optionally only those matching keywords.       |
| toolboxes                | Lists every tool with its toolbox.                                        |
| help                     | Prints the WhiteboxTools help.                                            |
| license [tool]           | Prints the WhiteboxTools license, or that of one tool.                    |
| version                  | Prints the WhiteboxTools version information.                             |
| tool-help <tool>         | Prints the help associated with a tool.                                   |
| tool-parameters <tool>   | Prints the parameters (in json form) of a tool.                           |
| toolbox [tool]           | Prints the toolbox associated with a tool.                                |
| view-code <tool>         | Opens the source code of a tool.                                          |
| set-max-procs <n>        | Sets the maximum number of processors WhiteboxTools may use.              |

Run parameters are given as `flag=value` pairs, with or without leading dashes,
and a boolean parameter may be given as a bare flag:

```text
>> wb_runner --wd=/data/ run slope dem=DEM.tif output=slope.tif units=percent
>> wb_runner run breach_depressions --dem=DEM.tif --output=breached.tif --fill_pits
```

The exit code of `run` is 0 when the tool completed, 1 on any error and 2
when the run was cancelled.
*/

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use wb_runner::configs::{default_exe_path, get_configs, Configs};
use wb_runner::{ArgumentValue, CancelFlag, RunnerError, ToolEvent, ToolRunner};

#[derive(Parser)]
#[command(name = "wb_runner", version, about = "Runs WhiteboxTools tools and queries")]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path of the WhiteboxTools executable (default: whitebox_tools beside this program)
    #[arg(long, env = "WHITEBOX_TOOLS_EXE", global = true)]
    exe: Option<PathBuf>,

    /// Working directory passed to tool runs
    #[arg(long, global = true)]
    wd: Option<String>,

    /// Directory holding settings.json (default: the current directory)
    #[arg(long, global = true)]
    settings_dir: Option<PathBuf>,

    /// Print tool output (true/false)
    #[arg(long, global = true, action = ArgAction::Set)]
    verbose: Option<bool>,

    /// Compress output rasters (true/false)
    #[arg(long, global = true, action = ArgAction::Set)]
    compress_rasters: Option<bool>,

    /// Maximum number of processors a tool may use; -1 leaves it to WhiteboxTools
    #[arg(long, global = true, allow_negative_numbers = true)]
    max_procs: Option<isize>,

    /// Print the assembled command line before running a tool
    #[arg(long, global = true)]
    output_command: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tool
    Run {
        /// Tool name, e.g. lidar_info or LidarInfo
        tool: String,
        /// Parameters as flag=value pairs; a bare flag sets a boolean. The global
        /// options (--wd, --verbose, ...) may also be given here, in --key=value form.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        params: Vec<String>,
    },
    /// List the available tools
    ListTools {
        /// Only list tools matching these keywords
        keywords: Vec<String>,
    },
    /// List every tool with its toolbox
    Toolboxes,
    /// Print the WhiteboxTools help
    Help,
    /// Print the WhiteboxTools license
    License {
        tool: Option<String>,
    },
    /// Print the WhiteboxTools version
    Version,
    /// Print the help of one tool
    ToolHelp {
        tool: String,
    },
    /// Print the parameters of one tool as JSON
    ToolParameters {
        tool: String,
    },
    /// Print the toolbox of a tool, or of every tool
    Toolbox {
        tool: Option<String>,
    },
    /// View the source code of a tool
    ViewCode {
        tool: String,
    },
    /// Set the maximum number of processors WhiteboxTools may use
    SetMaxProcs {
        #[arg(allow_negative_numbers = true)]
        max_procs: isize,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let mut cli = Cli::parse();
    lift_global_options(&mut cli)?;
    let runner = tool_runner(&cli)?;

    match cli.command {
        Commands::Run { tool, params } => run_tool(&runner, &tool, &params),
        Commands::ListTools { keywords } => {
            let tools = runner.list_tools(&keywords)?;
            println!("{} Available Tools:", tools.len());
            for (name, description) in &tools {
                println!("{}: {}", name, description);
            }
            Ok(0)
        }
        Commands::Toolboxes => {
            for (name, toolbox) in &runner.toolboxes()? {
                println!("{}: {}", name, toolbox);
            }
            Ok(0)
        }
        Commands::Help => print_output(runner.help()),
        Commands::License { tool } => print_output(runner.license(tool.as_deref())),
        Commands::Version => print_output(runner.version()),
        Commands::ToolHelp { tool } => print_output(runner.tool_help(&tool)),
        Commands::ToolParameters { tool } => print_output(runner.tool_parameters(&tool)),
        Commands::Toolbox { tool } => print_output(runner.toolbox(tool.as_deref())),
        Commands::ViewCode { tool } => print_output(runner.view_code(&tool)),
        Commands::SetMaxProcs { max_procs } => {
            let mut runner = runner;
            runner.set_max_procs(max_procs);
            print_output(runner.apply_max_procs())
        }
    }
}

fn tool_runner(cli: &Cli) -> Result<ToolRunner> {
    let configs = match &cli.settings_dir {
        Some(dir) => Configs::read(dir)?,
        None => get_configs().context("could not read the current directory")?,
    };
    let exe = match &cli.exe {
        Some(exe) => exe.clone(),
        None => default_exe_path().context("could not locate the WhiteboxTools executable")?,
    };

    let mut runner = ToolRunner::new(exe, configs);
    if let Some(wd) = &cli.wd {
        runner.set_working_directory(wd);
    }
    if let Some(verbose) = cli.verbose {
        runner.set_verbose_mode(verbose);
    }
    if let Some(compress) = cli.compress_rasters {
        runner.set_compress_rasters(compress);
    }
    if let Some(max_procs) = cli.max_procs {
        runner.set_max_procs(max_procs);
    }
    if cli.output_command {
        runner.set_output_command(true);
    }
    Ok(runner)
}

// Global options written after the tool name end up among the run
// parameters; move them back onto the command line settings.
fn lift_global_options(cli: &mut Cli) -> Result<()> {
    let params = match &mut cli.command {
        Commands::Run { params, .. } => std::mem::take(params),
        _ => return Ok(()),
    };
    let mut rest = vec![];
    for param in params {
        if !lift_global_option(cli, &param)? {
            rest.push(param);
        }
    }
    if let Commands::Run { params, .. } = &mut cli.command {
        *params = rest;
    }
    Ok(())
}

fn lift_global_option(cli: &mut Cli, param: &str) -> Result<bool> {
    let option = match param.strip_prefix("--") {
        Some(option) => option,
        None => return Ok(false),
    };
    let (key, value) = match option.split_once('=') {
        Some((key, value)) => (key.replace('_', "-"), Some(value.trim())),
        None => (option.replace('_', "-"), None),
    };
    let parse_bool = |v: &str| {
        v.to_lowercase()
            .parse::<bool>()
            .with_context(|| format!("invalid value '{}' for --{}", v, key))
    };
    match (key.as_str(), value) {
        ("exe", Some(v)) => cli.exe = Some(PathBuf::from(v)),
        ("wd", Some(v)) => cli.wd = Some(v.to_string()),
        ("settings-dir", Some(v)) => cli.settings_dir = Some(PathBuf::from(v)),
        ("verbose", Some(v)) => cli.verbose = Some(parse_bool(v)?),
        ("compress-rasters", Some(v)) => cli.compress_rasters = Some(parse_bool(v)?),
        ("max-procs", Some(v)) => {
            cli.max_procs = Some(
                v.parse::<isize>()
                    .with_context(|| format!("invalid value '{}' for --max-procs", v))?,
            )
        }
        ("output-command", None) => cli.output_command = true,
        ("output-command", Some(v)) => cli.output_command = parse_bool(v)?,
        _ => return Ok(false),
    }
    Ok(true)
}

fn run_tool(runner: &ToolRunner, tool: &str, params: &[String]) -> Result<i32> {
    let mut form = runner
        .tool_form(tool)
        .with_context(|| format!("could not read the parameters of {}", tool))?;
    for param in params {
        let (key, value) = match param.split_once('=') {
            Some((key, value)) => (key, ArgumentValue::from(value)),
            None => (param.as_str(), ArgumentValue::Flag(true)),
        };
        if !form.set(key, value) {
            bail!("{} has no parameter '{}'", tool, key);
        }
    }

    let cancel = CancelFlag::new();
    let result = runner.run_form(&form, &cancel, |event| match &event {
        ToolEvent::Progress { label, percent, .. } => eprintln!("{} {}%", label, percent),
        ToolEvent::Message { text } => println!("{}", text),
    });
    match result {
        Ok(status) => Ok(status.code()),
        // each problem has already been printed
        Err(RunnerError::Validation(_)) => Ok(1),
        Err(e) => Err(e.into()),
    }
}

fn print_output(output: wb_runner::errors::Result<String>) -> Result<i32> {
    print!("{}", output?);
    Ok(0)
}
