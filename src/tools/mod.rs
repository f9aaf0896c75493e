pub mod names;

use self::names::{to_camelcase, to_snakecase};
use crate::configs::Configs;
use crate::errors::{Result, RunnerError};
use crate::parameters::{parse_descriptors, ToolForm, ToolParameterDescriptor};
use crate::process::{
    line_callback, run_invocation, spawn_invocation, BackgroundRun, CancelFlag, ExitStatus,
    ToolEvent, ToolInvocation,
};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Front end to a WhiteboxTools executable.
///
/// Tool runs stream their output through a handler and can be cancelled.
/// The other commands (`help`, `version`, `list_tools`, ...) are simple
/// blocking queries that return the executable's complete output.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    exe_path: PathBuf,
    configs: Configs,
}

impl ToolRunner {
    pub fn new<P: Into<PathBuf>>(exe_path: P, configs: Configs) -> ToolRunner {
        ToolRunner {
            exe_path: exe_path.into(),
            configs,
        }
    }

    pub fn exe_path(&self) -> &Path {
        &self.exe_path
    }

    pub fn configs(&self) -> &Configs {
        &self.configs
    }

    pub fn set_working_directory(&mut self, working_directory: &str) {
        self.configs.working_directory = working_directory.to_string();
    }

    pub fn set_verbose_mode(&mut self, verbose_mode: bool) {
        self.configs.verbose_mode = verbose_mode;
    }

    pub fn set_compress_rasters(&mut self, compress_rasters: bool) {
        self.configs.compress_rasters = compress_rasters;
    }

    /// Limits the processors a run may use. Values of zero or less leave it
    /// to the executable.
    pub fn set_max_procs(&mut self, max_procs: isize) {
        self.configs.max_procs = max_procs;
    }

    pub fn set_output_command(&mut self, output_command: bool) {
        self.configs.output_command = output_command;
    }

    /// Snapshot of the current settings for one run of `tool_name`.
    pub fn invocation(&self, tool_name: &str, args: &[String]) -> ToolInvocation {
        ToolInvocation::new(tool_name, args.to_vec(), &self.configs)
    }

    /// Runs a tool with already-built argument tokens, passing each output
    /// line to `handler` as it arrives.
    pub fn run_tool<F: FnMut(ToolEvent)>(
        &self,
        tool_name: &str,
        args: &[String],
        cancel: &CancelFlag,
        handler: F,
    ) -> ExitStatus {
        run_invocation(&self.exe_path, &self.invocation(tool_name, args), cancel, handler)
    }

    /// `run_tool` for callers that only want plain output lines.
    pub fn run_tool_with_callback<F: FnMut(&str)>(
        &self,
        tool_name: &str,
        args: &[String],
        cancel: &CancelFlag,
        callback: F,
    ) -> ExitStatus {
        self.run_tool(tool_name, args, cancel, line_callback(callback))
    }

    /// Runs a tool on a worker thread.
    pub fn spawn_tool(&self, tool_name: &str, args: Vec<String>, cancel: CancelFlag) -> BackgroundRun {
        let invocation = ToolInvocation::new(tool_name, args, &self.configs);
        spawn_invocation(self.exe_path.clone(), invocation, cancel)
    }

    /// Validates the form and runs its tool. Validation problems are all
    /// delivered to `handler` before the error is returned; nothing is
    /// spawned in that case.
    pub fn run_form<F: FnMut(ToolEvent)>(
        &self,
        form: &ToolForm,
        cancel: &CancelFlag,
        mut handler: F,
    ) -> Result<ExitStatus> {
        match form.arguments() {
            Ok(args) => Ok(self.run_tool(form.tool_name(), &args, cancel, handler)),
            Err(errors) => {
                for e in &errors {
                    handler(ToolEvent::message(e.to_string()));
                }
                Err(errors.into())
            }
        }
    }

    pub fn help(&self) -> Result<String> {
        self.query(&["-h".to_string()])
    }

    pub fn license(&self, tool_name: Option<&str>) -> Result<String> {
        match tool_name {
            Some(name) => self.query(&[format!("--license={}", to_camelcase(name))]),
            None => self.query(&["--license".to_string()]),
        }
    }

    pub fn version(&self) -> Result<String> {
        self.query(&["--version".to_string()])
    }

    pub fn tool_help(&self, tool_name: &str) -> Result<String> {
        self.query(&[format!("--toolhelp={}", to_camelcase(tool_name))])
    }

    /// The raw parameter JSON of a tool.
    pub fn tool_parameters(&self, tool_name: &str) -> Result<String> {
        self.query(&[format!("--toolparameters={}", to_camelcase(tool_name))])
    }

    pub fn tool_descriptors(&self, tool_name: &str) -> Result<Vec<ToolParameterDescriptor>> {
        Ok(parse_descriptors(&self.tool_parameters(tool_name)?)?)
    }

    /// A fresh form for `tool_name`, filled with its default values.
    pub fn tool_form(&self, tool_name: &str) -> Result<ToolForm> {
        Ok(ToolForm::new(tool_name, self.tool_descriptors(tool_name)?))
    }

    /// The toolbox of one tool, or of every tool when `tool_name` is `None`.
    pub fn toolbox(&self, tool_name: Option<&str>) -> Result<String> {
        match tool_name {
            Some(name) => self.query(&[format!("--toolbox={}", to_camelcase(name))]),
            None => self.query(&["--toolbox".to_string()]),
        }
    }

    /// Maps every snake_case tool name to its toolbox.
    pub fn toolboxes(&self) -> Result<BTreeMap<String, String>> {
        Ok(parse_toolboxes(&self.toolbox(None)?))
    }

    pub fn view_code(&self, tool_name: &str) -> Result<String> {
        self.query(&[format!("--viewcode={}", to_camelcase(tool_name))])
    }

    /// Maps snake_case tool names to descriptions, optionally filtered by keywords.
    pub fn list_tools(&self, keywords: &[String]) -> Result<BTreeMap<String, String>> {
        let mut args = vec!["--listtools".to_string()];
        args.extend(keywords.iter().cloned());
        Ok(parse_tool_list(&self.query(&args)?))
    }

    /// Passes the current max procs setting to the executable.
    pub fn apply_max_procs(&self) -> Result<String> {
        self.query(&[format!("--max_procs={}", self.configs.max_procs)])
    }

    fn query(&self, args: &[String]) -> Result<String> {
        debug!("{} {}", self.exe_path.display(), args.join(" "));
        let output = Command::new(&self.exe_path)
            .args(args)
            .output()
            .map_err(|source| RunnerError::ProcessSpawn {
                exe: self.exe_path.clone(),
                source,
            })?;
        if !output.status.success() {
            warn!("{} exited with {}", args.join(" "), output.status);
        }
        let mut ret = String::from_utf8_lossy(&output.stdout).to_string();
        ret.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(ret)
    }
}

/// Parses `--listtools` output. The first line only states how many tools
/// follow and is skipped.
pub fn parse_tool_list(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .skip(1)
        .filter_map(split_name_and_value)
        .collect()
}

/// Parses `--toolbox` output, one `Tool: Toolbox` pair per line.
pub fn parse_toolboxes(output: &str) -> BTreeMap<String, String> {
    output.lines().filter_map(split_name_and_value).collect()
}

fn split_name_and_value(line: &str) -> Option<(String, String)> {
    if line.trim().is_empty() {
        return None;
    }
    match line.split_once(':') {
        Some((name, value)) => Some((to_snakecase(name), value.trim().to_string())),
        None => {
            debug!("Skipping unrecognized line: {}", line);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_tool_list() {
        let tools = parse_tool_list("5 Available Tools\nSlope: Calculates slope.\nAspect: Calculates aspect.\n");
        let mut expected = BTreeMap::new();
        expected.insert("slope".to_string(), "Calculates slope.".to_string());
        expected.insert("aspect".to_string(), "Calculates aspect.".to_string());
        assert_eq!(tools, expected);
    }

    #[test]
    fn test_parse_tool_list_blank_lines_and_colons() {
        let output = "All 2 Available Tools:\nLidarInfo: Prints information about a LiDAR (LAS) dataset.\n\nTINGridding: Creates a raster grid based on a TIN: fitted to points.\n\n";
        let tools = parse_tool_list(output);
        assert_eq!(tools.len(), 2);
        assert_eq!(
            tools.get("lidar_info").map(String::as_str),
            Some("Prints information about a LiDAR (LAS) dataset.")
        );
        assert_eq!(
            tools.get("tin_gridding").map(String::as_str),
            Some("Creates a raster grid based on a TIN: fitted to points.")
        );
    }

    #[test]
    fn test_parse_toolboxes() {
        let output = "Slope: Geomorphometric Analysis\n\nBreachDepressions: Hydrological Analysis\nnonsense\n";
        let boxes = parse_toolboxes(output);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes["slope"], "Geomorphometric Analysis");
        assert_eq!(boxes["breach_depressions"], "Hydrological Analysis");
    }

    #[test]
    fn test_setters_feed_invocation() {
        let mut runner = ToolRunner::new("/opt/wbt/whitebox_tools", Configs::default());
        runner.set_working_directory("/data/");
        runner.set_verbose_mode(false);
        runner.set_compress_rasters(true);
        runner.set_max_procs(2);
        let inv = runner.invocation("slope", &["--dem='dem.tif'".to_string()]);
        assert_eq!(
            inv.args(),
            vec![
                "--run=\"Slope\"",
                "--wd=\"/data/\"",
                "--dem='dem.tif'",
                "-v=false",
                "--compress_rasters=True",
                "--max_procs=2",
            ]
        );
    }

    #[test]
    fn test_query_spawn_failure() {
        let runner = ToolRunner::new("/nonexistent/whitebox_tools", Configs::default());
        assert!(matches!(runner.version(), Err(RunnerError::ProcessSpawn { .. })));
        assert!(matches!(runner.list_tools(&[]), Err(RunnerError::ProcessSpawn { .. })));
    }

    #[cfg(unix)]
    mod echo {
        use super::*;

        // /bin/echo prints its arguments back, which shows exactly what the
        // executable would have received.
        fn runner() -> ToolRunner {
            ToolRunner::new("/bin/echo", Configs::default())
        }

        #[test]
        fn test_queries_pass_camelcase_names() {
            let runner = runner();
            assert_eq!(runner.help().unwrap(), "-h\n");
            assert_eq!(runner.tool_help("lidar_info").unwrap(), "--toolhelp=LidarInfo\n");
            assert_eq!(runner.license(Some("slope")).unwrap(), "--license=Slope\n");
            assert_eq!(runner.toolbox(None).unwrap(), "--toolbox\n");
            assert_eq!(runner.view_code("breach_depressions").unwrap(), "--viewcode=BreachDepressions\n");
        }

        #[test]
        fn test_run_tool_streams_arguments() {
            let runner = runner();
            let mut lines = vec![];
            let status = runner.run_tool_with_callback(
                "slope",
                &["--dem='dem.tif'".to_string()],
                &CancelFlag::new(),
                |line| lines.push(line.to_string()),
            );
            assert_eq!(status, ExitStatus::Completed);
            assert_eq!(lines, vec!["--run=\"Slope\" --dem='dem.tif' -v --compress_rasters=False"]);
        }

        #[test]
        fn test_output_command_is_echoed_first() {
            let mut runner = runner();
            runner.set_output_command(true);
            let mut events = vec![];
            runner.run_tool("slope", &[], &CancelFlag::new(), |e| events.push(e));
            assert_eq!(events.len(), 2);
            assert_eq!(events[0].line(), "/bin/echo --run=\"Slope\" -v --compress_rasters=False");
        }

        #[test]
        fn test_run_form_reports_every_problem() {
            let form = ToolForm::from_json(
                "slope",
                r#"[{"name": "Input DEM", "flags": ["-i", "--dem"], "parameter_type": {"ExistingFile": "Raster"}, "optional": false},
                    {"name": "Output", "flags": ["--output"], "parameter_type": {"NewFile": "Raster"}, "optional": false}]"#,
            )
            .unwrap();
            let mut events = vec![];
            let result = runner().run_form(&form, &CancelFlag::new(), |e| events.push(e));
            match result {
                Err(RunnerError::Validation(errors)) => assert_eq!(errors.0.len(), 2),
                other => panic!("unexpected result: {:?}", other),
            }
            assert_eq!(events.len(), 2);
            assert!(events[0].line().contains("--dem"));
            assert!(events[1].line().contains("--output"));
        }

        #[test]
        fn test_run_form_runs_valid_form() {
            let mut form = ToolForm::from_json(
                "slope",
                r#"[{"name": "Input DEM", "flags": ["-i", "--dem"], "parameter_type": {"ExistingFile": "Raster"}, "optional": false}]"#,
            )
            .unwrap();
            form.set("dem", "dem.tif");
            let mut events = vec![];
            let status = runner()
                .run_form(&form, &CancelFlag::new(), |e| events.push(e))
                .unwrap();
            assert_eq!(status, ExitStatus::Completed);
            assert_eq!(events[0].line(), "--run=\"Slope\" --dem='dem.tif' -v --compress_rasters=False");
        }

        #[test]
        fn test_spawn_tool() {
            let run = runner().spawn_tool("lidar_info", vec!["--vlr".to_string()], CancelFlag::new());
            let lines: Vec<String> = run.events().iter().map(|e| e.line().to_string()).collect();
            assert_eq!(run.join(), ExitStatus::Completed);
            assert_eq!(lines, vec!["--run=\"LidarInfo\" --vlr -v --compress_rasters=False"]);
        }
    }
}
