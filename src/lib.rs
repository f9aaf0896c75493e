/*!
wb_runner drives an external WhiteboxTools executable.

It turns a tool's JSON parameter descriptions (as printed by
`--toolparameters`) into validated command-line arguments, launches the
executable, streams its output line by line while picking out progress
reports, and lets the caller cancel a run part way through.

| Module        | Description                                                                     |
| ------------- | ------------------------------------------------------------------------------- |
| `configs`     | Run settings, read from an optional settings.json.                              |
| `errors`      | Schema, validation and process errors.                                          |
| `parameters`  | Parameter descriptors, argument building and the editable `ToolForm`.           |
| `process`     | The run engine: argument vector, output streaming, progress and cancellation.   |
| `tools`       | `ToolRunner`, plus the single-shot queries (--listtools, --toolhelp, ...).      |

# Example

```no_run
use wb_runner::{CancelFlag, Configs, ToolRunner};

let runner = ToolRunner::new("/opt/WBT/whitebox_tools", Configs::default());
let mut form = runner.tool_form("slope")?;
form.set("dem", "DEM.tif");
form.set("output", "slope.tif");
let status = runner.run_form(&form, &CancelFlag::new(), |event| println!("{}", event))?;
std::process::exit(status.code());
# Ok::<(), wb_runner::RunnerError>(())
```
*/

pub mod configs;
pub mod errors;
pub mod parameters;
pub mod process;
pub mod tools;

pub use crate::configs::{default_exe_path, get_configs, Configs};
pub use crate::errors::{RunnerError, SchemaError, ValidationError, ValidationErrors};
pub use crate::parameters::{
    build_argument, build_arguments, parse_descriptors, ArgumentValue, ParameterType,
    ParameterValues, ToolForm, ToolParameterDescriptor,
};
pub use crate::process::{BackgroundRun, CancelFlag, ExitStatus, ToolEvent, ToolInvocation};
pub use crate::tools::ToolRunner;
