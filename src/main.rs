use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dialogist::sieves::{DEFAULT_MS_SIEVES, DEFAULT_QM_SIEVES};
use dialogist::{
    AttributionConfig, AttributionReport, Dictionaries, Document, HumanReport, LinearScorer,
    PreprocessConfig, QuoteScorer, RawMentions, ResourcePaths, TwinPolicy, attribute_quotes,
    load_scorer, parse_conll_file, parse_document_file, preprocess,
};

#[derive(Parser)]
#[command(name = "dialogist")]
#[command(author, version, about = "Coreference document model and quote attribution", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attribute the quotations of one or more documents to speakers
    Attribute {
        /// Input document file (JSON, or CoNLL-2011 with --conll); repeatable
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Output directory for machine-readable reports (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Also write a human-readable report next to each JSON report
        #[arg(long)]
        human_readable: bool,

        /// Read inputs as CoNLL-2011 files
        #[arg(long)]
        conll: bool,

        /// Quote-to-mention sieves, in order
        #[arg(long, default_value = DEFAULT_QM_SIEVES)]
        qm_sieves: String,

        /// Mention-to-speaker sieves, in order
        #[arg(long, default_value = DEFAULT_MS_SIEVES)]
        ms_sieves: String,

        /// Scorer model for the supervised sieve (JSON)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Pair gold and predicted mentions by head as well as by span
        #[arg(long)]
        relaxed_twins: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the document model of a document without attributing quotes
    Analyze {
        /// Input document file (JSON, or CoNLL-2011 with --conll)
        #[arg(short, long)]
        input: PathBuf,

        /// Read the input as a CoNLL-2011 file
        #[arg(long)]
        conll: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Attribute {
            input,
            output,
            human_readable,
            conll,
            qm_sieves,
            ms_sieves,
            model,
            relaxed_twins,
            verbose,
        } => {
            setup_logging(verbose);
            let attribution = AttributionConfig::from_lists(&qm_sieves, &ms_sieves)
                .context("Invalid sieve list")?;
            let preprocess_config = PreprocessConfig {
                twin_policy: if relaxed_twins {
                    TwinPolicy::Relaxed
                } else {
                    TwinPolicy::Strict
                },
                ..Default::default()
            };
            let scorer = model
                .as_deref()
                .map(load_scorer)
                .transpose()
                .context("Failed to load scorer model")?;
            let settings = Arc::new(Settings {
                dict: ResourcePaths::from_env().load()?,
                preprocess: preprocess_config,
                attribution,
                scorer,
                human_readable,
            });
            attribute_documents(input, output, conll, settings).await
        }
        Commands::Analyze {
            input,
            conll,
            verbose,
        } => {
            setup_logging(verbose);
            analyze_document(&input, conll)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

/// Everything shared read-only by the per-document workers
struct Settings {
    dict: Dictionaries,
    preprocess: PreprocessConfig,
    attribution: AttributionConfig,
    scorer: Option<LinearScorer>,
    human_readable: bool,
}

fn load_documents(path: &Path, conll: bool) -> Result<Vec<(Document, RawMentions)>> {
    if conll {
        parse_conll_file(path).context("Failed to parse CoNLL input")
    } else {
        let document = parse_document_file(path).context("Failed to parse input document")?;
        Ok(vec![document])
    }
}

async fn attribute_documents(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    conll: bool,
    settings: Arc<Settings>,
) -> Result<()> {
    std::fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create directory: {:?}", output))?;

    let mut documents = Vec::new();
    for path in &inputs {
        info!("Loading documents from {:?}", path);
        documents.extend(load_documents(path, conll)?);
    }
    info!("Loaded {} documents", documents.len());

    let mut handles = Vec::with_capacity(documents.len());
    for (doc, raw) in documents {
        let settings = Arc::clone(&settings);
        let output = output.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            process_document(doc, raw, &settings, &output)
        }));
    }

    let mut failed = 0;
    for handle in handles {
        match handle.await.context("Document worker panicked")? {
            Ok(doc_id) => info!("Finished {}", doc_id),
            Err(e) => {
                warn!("Document failed: {:#}", e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{} documents failed", failed);
    }
    Ok(())
}

fn process_document(
    mut doc: Document,
    raw: RawMentions,
    settings: &Settings,
    output: &Path,
) -> Result<String> {
    preprocess(&mut doc, raw, &settings.dict, &settings.preprocess)
        .with_context(|| format!("Failed to preprocess {}", doc.doc_id))?;
    let result = attribute_quotes(
        &mut doc,
        &settings.dict,
        &settings.attribution,
        settings.scorer.as_ref().map(|s| s as &dyn QuoteScorer),
    );

    let stem = file_stem(&doc.doc_id);
    let json_path = output.join(format!("{}.json", stem));
    AttributionReport::from_document(&doc, &result).write_json(&json_path)?;
    info!("Output written to {:?}", json_path);
    if settings.human_readable {
        let text_path = output.join(format!("{}.txt", stem));
        HumanReport::new(&doc).write_file(&text_path)?;
        info!("Human-readable output written to {:?}", text_path);
    }
    Ok(doc.doc_id)
}

/// Document ids may carry path separators and part numbers
fn file_stem(doc_id: &str) -> String {
    doc_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn analyze_document(input: &Path, conll: bool) -> Result<()> {
    info!("Analyzing documents from {:?}", input);
    let dict = ResourcePaths::from_env().load()?;

    for (mut doc, raw) in load_documents(input, conll)? {
        let result = preprocess(&mut doc, raw, &dict, &PreprocessConfig::default())
            .with_context(|| format!("Failed to preprocess {}", doc.doc_id))?;

        println!("Document {}", doc.doc_id);
        println!("==================");
        println!("Type: {:?}", doc.doc_type);
        println!("Sentences: {}", doc.sentences.len());
        println!("Tokens: {}", doc.token_count());
        println!("Paragraphs: {}", result.paragraphs);
        println!("Utterances: {}", result.utterances);
        println!();

        println!("Speakers");
        println!("--------");
        for (utterance, speaker) in &doc.speakers {
            let name = doc
                .speaker_info_map
                .get(speaker)
                .map(|info| info.speaker_name.as_str())
                .unwrap_or(speaker.as_str());
            println!("Utterance {}: {}", utterance, name);
        }
        println!();

        println!("Mentions");
        println!("--------");
        println!("Predicted: {}", result.predicted_mentions);
        println!("Gold: {} ({} twins)", result.gold_mentions, result.twins_found);
        println!("Speaker pairs: {}", doc.speaker_pairs.len());
        println!();

        println!("Clusters");
        println!("--------");
        for cluster in doc.coref_clusters.values().filter(|c| c.size() > 1) {
            let texts: Vec<&str> = cluster
                .members
                .iter()
                .filter_map(|&id| doc.mention(id))
                .map(|m| m.span_text.as_str())
                .collect();
            println!("Cluster {}: {}", cluster.cluster_id, texts.join(" | "));
        }
        println!();

        println!("Quotes: {}", doc.quotes.len());
        println!();
    }

    Ok(())
}
