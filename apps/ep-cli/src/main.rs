use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ep_app::{
    AppError, AppResult, ClassificationService, EngineRunner, PreprocessingService, RunStatus,
    SETTINGS_FILE, StatusLevel, StatusMessage, WorkspaceSettings, status_channel,
};
use ep_markup::list_edit::{self, ListTarget};
use ep_markup::{ConvLayer, DropdownSpec, FixedSlider, RangeSliderSpec, SliderValues};
use ep_script::PreprocessingParams;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "eegprep")]
#[command(about = "EEG preprocessing configuration tool", long_about = None)]
struct Cli {
    /// Workspace root containing eegprep.yaml and the host files
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default eegprep.yaml into the workspace root
    Init,
    /// Preprocessing parameters in the MATLAB preprocessing script
    #[command(subcommand)]
    Params(ParamsCommands),
    /// Show or set the data directory in the pipeline script
    DataDir { path: Option<String> },
    /// Show or set the toolbox path in the pipeline script
    Toolbox { path: Option<String> },
    /// Show or set the accepted channel list in the pipeline script
    Channels {
        /// New channel list; shows the current one when empty
        channels: Vec<String>,
    },
    /// Custom dropdowns on the preprocessing page
    #[command(subcommand)]
    Dropdown(DropdownCommands),
    /// Custom range sliders on the preprocessing page
    #[command(subcommand)]
    RangeSlider(RangeSliderCommands),
    /// Fixed range sliders on the preprocessing page
    #[command(subcommand)]
    Slider(SliderCommands),
    /// Option lists on the preprocessing page
    #[command(subcommand)]
    List(ListCommands),
    /// Persist a combo box selection and reset its dropdown
    Select {
        combo_id: String,
        dropdown_id: String,
        index: i64,
    },
    /// Convolutional layer configuration of the classifier
    #[command(subcommand)]
    Layers(LayerCommands),
    /// Start the processing engine and wait for its report
    Run {
        /// Save the current parameters and point the pipeline at this
        /// directory before starting
        #[arg(long)]
        data_dir: Option<String>,
    },
}

#[derive(Subcommand)]
enum ParamsCommands {
    /// Print the parameters as YAML
    Show,
    /// Change parameters and save them with the current channel list
    Set(ParamOverrides),
}

#[derive(Args)]
struct ParamOverrides {
    /// YAML file with a full or partial parameter set
    #[arg(long)]
    file: Option<PathBuf>,
    #[arg(long)]
    prestim: Option<f64>,
    #[arg(long)]
    poststim: Option<f64>,
    #[arg(long)]
    trialfun: Option<String>,
    #[arg(long)]
    eventtype: Option<String>,
    #[arg(long, num_args = 1..)]
    eventvalue: Option<Vec<String>>,
    #[arg(long)]
    demean: Option<bool>,
    #[arg(long, num_args = 2, allow_negative_numbers = true)]
    baseline: Option<Vec<f64>>,
    #[arg(long)]
    dftfilter: Option<bool>,
    #[arg(long, num_args = 2)]
    dftfreq: Option<Vec<f64>>,
}

#[derive(Subcommand)]
enum DropdownCommands {
    List,
    /// Create a dropdown, or update the one bound to the same property
    Add(DropdownArgs),
    Update {
        id: String,
        #[command(flatten)]
        spec: DropdownArgs,
    },
    Remove { id: String },
}

#[derive(Args)]
struct DropdownArgs {
    #[arg(long, default_value = "")]
    label: String,
    /// MATLAB property the dropdown writes, e.g. `cfg.reref`
    #[arg(long)]
    property: String,
    #[arg(long)]
    multi: bool,
    #[arg(long, default_value_t = 1)]
    max_selections: i64,
    #[arg(long, value_delimiter = ',')]
    items: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    selected: Vec<String>,
}

impl From<DropdownArgs> for DropdownSpec {
    fn from(args: DropdownArgs) -> Self {
        DropdownSpec {
            label: args.label,
            matlab_property: args.property,
            is_multi_select: args.multi,
            max_selections: args.max_selections,
            all_items: args.items,
            selected_items: args.selected,
        }
    }
}

#[derive(Subcommand)]
enum RangeSliderCommands {
    List,
    Add(RangeSliderArgs),
    Update {
        id: String,
        #[command(flatten)]
        spec: RangeSliderArgs,
    },
    Remove { id: String },
}

#[derive(Args)]
struct RangeSliderArgs {
    #[arg(long, default_value = "")]
    label: String,
    #[arg(long)]
    property: String,
    #[arg(long, allow_negative_numbers = true)]
    from: f64,
    #[arg(long, allow_negative_numbers = true)]
    to: f64,
    #[arg(long, allow_negative_numbers = true)]
    first: f64,
    #[arg(long, allow_negative_numbers = true)]
    second: f64,
    #[arg(long, default_value_t = 0.1)]
    step: f64,
    #[arg(long, default_value = "")]
    unit: String,
}

impl From<RangeSliderArgs> for RangeSliderSpec {
    fn from(args: RangeSliderArgs) -> Self {
        RangeSliderSpec {
            label: args.label,
            matlab_property: args.property,
            from: args.from,
            to: args.to,
            first_value: args.first,
            second_value: args.second,
            step_size: args.step,
            unit: args.unit,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SliderArg {
    Baseline,
    PrestimPoststim,
    Dftfreq,
}

impl From<SliderArg> for FixedSlider {
    fn from(arg: SliderArg) -> Self {
        match arg {
            SliderArg::Baseline => FixedSlider::Baseline,
            SliderArg::PrestimPoststim => FixedSlider::PrestimPoststim,
            SliderArg::Dftfreq => FixedSlider::Dftfreq,
        }
    }
}

#[derive(Subcommand)]
enum SliderCommands {
    Show { slider: SliderArg },
    Set {
        slider: SliderArg,
        #[arg(long, allow_negative_numbers = true)]
        from: f64,
        #[arg(long, allow_negative_numbers = true)]
        to: f64,
        #[arg(long, allow_negative_numbers = true)]
        first: f64,
        #[arg(long, allow_negative_numbers = true)]
        second: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ListArg {
    Channels,
    Trialfun,
    Eventtype,
    Eventvalue,
    TrialfunModel,
    EventtypeModel,
}

impl ListArg {
    fn target(self) -> ListTarget {
        match self {
            ListArg::Channels => list_edit::CHANNEL_ITEMS,
            ListArg::Trialfun => list_edit::TRIALFUN_ITEMS,
            ListArg::Eventtype => list_edit::EVENTTYPE_ITEMS,
            ListArg::Eventvalue => list_edit::EVENTVALUE_ITEMS,
            ListArg::TrialfunModel => list_edit::TRIALFUN_MODEL,
            ListArg::EventtypeModel => list_edit::EVENTTYPE_MODEL,
        }
    }
}

#[derive(Subcommand)]
enum ListCommands {
    Show { list: ListArg },
    Add {
        list: ListArg,
        item: String,
        /// Dropdown to reset to its default state afterwards
        #[arg(long)]
        dropdown: Option<String>,
    },
    Remove { list: ListArg, item: String },
}

#[derive(Subcommand)]
enum LayerCommands {
    Show,
    Set {
        index: usize,
        in_channels: i64,
        out_channels: i64,
        kernel_size: i64,
        padding: i64,
    },
    /// Restore the default thirteen layers
    Reset,
}

#[derive(Serialize)]
struct Listed<'a, T> {
    id: &'a str,
    #[serde(flatten)]
    spec: &'a T,
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = WorkspaceSettings::load_or_default(&cli.root)?;
    tracing::debug!(root = %cli.root.display(), "workspace settings loaded");
    let (tx, rx) = status_channel();

    let ok = match cli.command {
        Commands::Init => cmd_init(&cli.root)?,
        Commands::Layers(cmd) => cmd_layers(ClassificationService::load(settings, tx), cmd)?,
        command => {
            let service = PreprocessingService::new(settings, tx);
            dispatch(&service, command, &rx)?
        }
    };

    print_status(&rx);
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn dispatch(
    service: &PreprocessingService,
    command: Commands,
    rx: &Receiver<StatusMessage>,
) -> AppResult<bool> {
    let ok = match command {
        Commands::Params(ParamsCommands::Show) => {
            print_yaml(&service.load_params())?;
            true
        }
        Commands::Params(ParamsCommands::Set(overrides)) => {
            let params = apply_overrides(service.load_params(), overrides)?;
            service.save_configuration(&params, &service.channels())
        }
        Commands::DataDir { path: None } => {
            println!("{}", service.data_dir());
            true
        }
        Commands::DataDir { path: Some(path) } => service.set_data_dir(&path),
        Commands::Toolbox { path: None } => {
            println!("{}", service.toolbox_path());
            true
        }
        Commands::Toolbox { path: Some(path) } => service.set_toolbox_path(&path),
        Commands::Channels { channels } if channels.is_empty() => {
            println!("{}", service.channels().join(" "));
            true
        }
        Commands::Channels { channels } => service.set_channels(&channels),
        Commands::Dropdown(cmd) => cmd_dropdown(service, cmd)?,
        Commands::RangeSlider(cmd) => cmd_range_slider(service, cmd)?,
        Commands::Slider(cmd) => cmd_slider(service, cmd),
        Commands::List(cmd) => cmd_list(service, cmd),
        Commands::Select {
            combo_id,
            dropdown_id,
            index,
        } => service.save_selection(&combo_id, &dropdown_id, index),
        Commands::Run { data_dir } => cmd_run(service, data_dir, rx)?,
        // Workspace-level commands are handled in main.
        Commands::Init | Commands::Layers(_) => false,
    };
    Ok(ok)
}

fn cmd_init(root: &Path) -> AppResult<bool> {
    let path = root.join(SETTINGS_FILE);
    if path.exists() {
        return Err(AppError::Settings(format!(
            "{} already exists",
            path.display()
        )));
    }
    WorkspaceSettings::default().save(&path)?;
    println!("✓ Wrote {}", path.display());
    Ok(true)
}

fn apply_overrides(
    mut params: PreprocessingParams,
    overrides: ParamOverrides,
) -> AppResult<PreprocessingParams> {
    if let Some(file) = &overrides.file {
        let content = std::fs::read_to_string(file).map_err(|e| AppError::DocumentRead {
            path: file.clone(),
            source: e,
        })?;
        params = serde_yaml::from_str(&content)
            .map_err(|e| AppError::Settings(format!("Failed to parse parameter YAML: {}", e)))?;
    }
    if let Some(v) = overrides.prestim {
        params.prestim = v;
    }
    if let Some(v) = overrides.poststim {
        params.poststim = v;
    }
    if let Some(v) = overrides.trialfun {
        params.trialfun = v;
    }
    if let Some(v) = overrides.eventtype {
        params.eventtype = v;
    }
    if let Some(v) = overrides.eventvalue {
        params.eventvalue = v;
    }
    if let Some(v) = overrides.demean {
        params.demean = v;
    }
    if let Some(v) = overrides.baseline {
        params.baseline_window = v;
    }
    if let Some(v) = overrides.dftfilter {
        params.dftfilter = v;
    }
    if let Some(v) = overrides.dftfreq {
        params.dftfreq = v;
    }
    Ok(params)
}

fn cmd_dropdown(service: &PreprocessingService, cmd: DropdownCommands) -> AppResult<bool> {
    let ok = match cmd {
        DropdownCommands::List => {
            let dropdowns = service.dropdowns();
            let listed: Vec<_> = dropdowns
                .iter()
                .map(|(id, spec)| Listed { id, spec })
                .collect();
            print_yaml(&listed)?;
            true
        }
        DropdownCommands::Add(args) => {
            let id = service.save_dropdown(&args.into());
            if !id.is_empty() {
                println!("✓ Saved {}", id);
            }
            !id.is_empty()
        }
        DropdownCommands::Update { id, spec } => service.update_dropdown(&id, &spec.into()),
        DropdownCommands::Remove { id } => service.remove_dropdown(&id),
    };
    Ok(ok)
}

fn cmd_range_slider(service: &PreprocessingService, cmd: RangeSliderCommands) -> AppResult<bool> {
    let ok = match cmd {
        RangeSliderCommands::List => {
            let sliders = service.range_sliders();
            let listed: Vec<_> = sliders
                .iter()
                .map(|(id, spec)| Listed { id, spec })
                .collect();
            print_yaml(&listed)?;
            true
        }
        RangeSliderCommands::Add(args) => {
            let id = service.save_range_slider(&args.into());
            if !id.is_empty() {
                println!("✓ Saved {}", id);
            }
            !id.is_empty()
        }
        RangeSliderCommands::Update { id, spec } => {
            service.update_range_slider(&id, &spec.into())
        }
        RangeSliderCommands::Remove { id } => service.remove_range_slider(&id),
    };
    Ok(ok)
}

fn cmd_slider(service: &PreprocessingService, cmd: SliderCommands) -> bool {
    match cmd {
        SliderCommands::Show { slider } => match service.slider(slider.into()) {
            Some(values) => {
                println!(
                    "from {}  to {}  first {}  second {}",
                    values.from, values.to, values.first_value, values.second_value
                );
                true
            }
            None => false,
        },
        SliderCommands::Set {
            slider,
            from,
            to,
            first,
            second,
        } => {
            let values = SliderValues {
                from,
                to,
                first_value: first,
                second_value: second,
            };
            service.update_slider(slider.into(), &values)
        }
    }
}

fn cmd_list(service: &PreprocessingService, cmd: ListCommands) -> bool {
    match cmd {
        ListCommands::Show { list } => {
            for item in service.list_items(list.target()) {
                println!("{}", item);
            }
            true
        }
        ListCommands::Add {
            list,
            item,
            dropdown: Some(dropdown),
        } => service.add_model_option(list.target(), &dropdown, &item),
        ListCommands::Add {
            list,
            item,
            dropdown: None,
        } => service.add_list_item(list.target(), &item),
        ListCommands::Remove { list, item } => service.remove_list_item(list.target(), &item),
    }
}

fn cmd_layers(mut service: ClassificationService, cmd: LayerCommands) -> AppResult<bool> {
    let ok = match cmd {
        LayerCommands::Show => {
            println!("{:>5} {:>6} {:>6} {:>6} {:>7}", "layer", "in", "out", "kernel", "padding");
            for (i, layer) in service.layers().iter().enumerate() {
                println!(
                    "{:>5} {:>6} {:>6} {:>6} {:>7}",
                    i, layer.in_channels, layer.out_channels, layer.kernel_size, layer.padding
                );
            }
            true
        }
        LayerCommands::Set {
            index,
            in_channels,
            out_channels,
            kernel_size,
            padding,
        } => service.update_layer(
            index,
            ConvLayer::new(in_channels, out_channels, kernel_size, padding),
        ),
        LayerCommands::Reset => service.reset_to_defaults(),
    };
    Ok(ok)
}

fn cmd_run(
    service: &PreprocessingService,
    data_dir: Option<String>,
    rx: &Receiver<StatusMessage>,
) -> AppResult<bool> {
    let runner = EngineRunner::new();
    let run = match data_dir {
        Some(dir) => {
            let params = service.load_params();
            service.save_and_run(&params, &service.channels(), &dir, &runner)
        }
        None => service.start_engine(&runner),
    };
    let Some(run) = run else {
        return Ok(false);
    };

    print_status(rx);
    println!("Waiting for {}...", service.settings().engine.executable);
    let report = run.wait()?;
    println!("{}", report.summary());
    if !report.stderr.trim().is_empty() {
        eprintln!("{}", report.stderr.trim_end());
    }
    Ok(report.status == RunStatus::Succeeded)
}

fn print_yaml<T: Serialize>(value: &T) -> AppResult<()> {
    let yaml = serde_yaml::to_string(value)
        .map_err(|e| AppError::Settings(format!("Failed to serialize output: {}", e)))?;
    print!("{}", yaml);
    Ok(())
}

fn print_status(rx: &Receiver<StatusMessage>) {
    for message in rx.try_iter() {
        match message.level {
            StatusLevel::Info => println!("✓ {}", message.text),
            StatusLevel::Warning => eprintln!("! {}", message.text),
            StatusLevel::Error => eprintln!("✗ {}", message.text),
        }
    }
}
