//! Datatable Render CLI
//!
//! Renders a datatable from files, without a web server:
//! 1. Loads table options (YAML, or JSON for `.json` files) and rows (JSON array of objects)
//! 2. Applies request parameters given as key=value pairs
//! 3. Prints the AJAX payload, or the HTML skeleton for page requests
//!
//! Rows are taken as already searched and ordered.
//!
//! Usage:
//!   cargo run --bin datatable-render -- \
//!     --options config/entries.yaml \
//!     --rows data/entries.json \
//!     --param ajax=true --param sEcho=1 --param iDisplayLength=10
//!
//!   # Skeleton for the initial page
//!   cargo run --bin datatable-render -- \
//!     --options config/entries.yaml --rows data/entries.json --url /entries/

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;

use datatable_view::{
    DatatableOptions, DatatableRequest, DatatableResponse, DatatableSettings, DatatableView,
    LegacyDatatable, ModelMeta, ModelSchema, Record, RecordCollection, RowSource,
};

/// Render datatable payloads and skeletons from files
#[derive(Parser, Debug)]
#[command(name = "datatable-render")]
#[command(about = "Render legacy dataTables.js payloads and table skeletons")]
struct Args {
    /// Table options (YAML, or JSON when the file ends in `.json`)
    #[arg(long, short = 'o')]
    options: PathBuf,

    /// Rows (JSON array of objects)
    #[arg(long, short = 'r')]
    rows: PathBuf,

    /// Model field labels (YAML, `fields: [{name, verbose_name}]`)
    #[arg(long, short = 'm')]
    model: Option<PathBuf>,

    /// Request path, used as the skeleton's data-url
    #[arg(long, default_value = "/")]
    url: String,

    /// Request parameters in format key=value (can be specified multiple times)
    #[arg(long, short = 'p', value_parser = parse_key_val)]
    param: Vec<(String, String)>,

    /// Unfiltered record count (default: number of rows)
    #[arg(long)]
    total: Option<usize>,

    /// Pretty-print JSON payloads (also enabled by DATATABLE_DEBUG)
    #[arg(long)]
    debug: bool,
}

/// Parse key=value pairs from command line
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("Invalid key=value pair: {}", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

struct FileView {
    options: DatatableOptions,
    rows: Vec<Arc<dyn RowSource>>,
    total: Option<usize>,
    model: Option<ModelSchema>,
}

impl DatatableView for FileView {
    fn get_datatable_options(&self) -> DatatableOptions {
        self.options.clone()
    }

    fn get_object_list(
        &self,
        _options: &DatatableOptions,
    ) -> datatable_view::Result<RecordCollection> {
        let unpaged = self.rows.len();
        Ok(RecordCollection::new(
            self.rows.clone(),
            self.total.unwrap_or(unpaged),
            unpaged,
        ))
    }

    fn model(&self) -> Option<&dyn ModelMeta> {
        self.model.as_ref().map(|m| m as &dyn ModelMeta)
    }
}

fn load_rows(path: &PathBuf) -> anyhow::Result<Vec<Arc<dyn RowSource>>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rows from {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&source)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    let Some(items) = value.as_array() else {
        bail!("{} must contain a JSON array of objects", path.display());
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match Record::from_json(item) {
            Some(record) => Ok(Arc::new(record) as Arc<dyn RowSource>),
            None => bail!("Row {} in {} is not an object", i, path.display()),
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let options_source = std::fs::read_to_string(&args.options)
        .with_context(|| format!("Failed to read options from {}", args.options.display()))?;
    let options = if args.options.extension().is_some_and(|ext| ext == "json") {
        DatatableOptions::from_json(&options_source)
    } else {
        DatatableOptions::from_yaml(&options_source)
    }
    .with_context(|| format!("Invalid options in {}", args.options.display()))?;

    let model = match &args.model {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read model from {}", path.display()))?;
            Some(
                serde_yaml::from_str::<ModelSchema>(&source)
                    .with_context(|| format!("Invalid model in {}", path.display()))?,
            )
        }
        None => None,
    };

    let view = FileView {
        options,
        rows: load_rows(&args.rows)?,
        total: args.total,
        model,
    };

    let mut request = DatatableRequest::new(args.url.clone());
    for (key, value) in args.param {
        request = request.with_param(key, value);
    }

    let mut settings = DatatableSettings::from_env();
    settings.debug |= args.debug;
    let datatable = LegacyDatatable::new(&view, &request, settings)?;

    match datatable.get()? {
        DatatableResponse::Json { body, .. } => println!("{}", body),
        DatatableResponse::Page { structure, .. } => print!("{}", structure.render()?),
    }

    Ok(())
}
