//! chipfile-dump — inspect container files without prior schema knowledge.
//!
//! Prints a file's header (identity, lineage, parameter buckets) and the
//! schema of every dataset it declares. With `--rows N`, also prints up to
//! N decoded rows per dataset.
//!
//! Usage: chipfile-dump [--json] [--rows N] <file>...

use std::path::Path;

use anyhow::{bail, Context, Result};

use chipfile::{ContainerReader, Entry};

struct Options {
    json: bool,
    rows: u32,
    paths: Vec<String>,
}

fn parse_args() -> Result<Options> {
    let mut options = Options {
        json: false,
        rows: 0,
        paths: Vec::new(),
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => options.json = true,
            "--rows" => {
                let n = args.next().context("--rows needs a count")?;
                options.rows = n.parse().with_context(|| format!("bad row count '{n}'"))?;
            }
            "--help" | "-h" => {
                println!("Usage: chipfile-dump [--json] [--rows N] <file>...");
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("unknown option '{other}'"),
            path => options.paths.push(path.to_string()),
        }
    }
    if options.paths.is_empty() {
        bail!("no input files; see --help");
    }
    Ok(options)
}

fn dump(path: &Path, options: &Options) -> Result<()> {
    if !ContainerReader::is_container_file(path) {
        bail!("{} is not a container file", path.display());
    }

    if options.rows == 0 && !options.json {
        // Header-only mode: no row data is read at all.
        let container = ContainerReader::read_header(path)
            .map_err(|err| anyhow::anyhow!("[{}] {}", err.code(), err))?;
        print_summary(path, &container);
        return Ok(());
    }

    let reader =
        ContainerReader::open(path).map_err(|err| anyhow::anyhow!("[{}] {}", err.code(), err))?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(reader.container())?);
    } else {
        print_summary(path, reader.container());
    }
    for dataset in reader.container().datasets() {
        let take = options.rows.min(dataset.row_count());
        for index in 0..take {
            let entry = reader.entry(dataset.kind(), index)?;
            println!("  [{} {}] {}", dataset.kind().name(), index, render(&entry));
        }
    }
    Ok(())
}

fn print_summary(path: &Path, container: &chipfile::Container) {
    let header = &container.header;
    println!("{}", path.display());
    println!(
        "  id={} array={} alg={}/{} parents={}",
        header.file_id,
        header.array_type,
        header.alg_name,
        header.alg_version,
        header.parents.len()
    );
    for bucket in [
        ("general", &header.general_params),
        ("algorithm", &header.algorithm_params),
        ("summary", &header.summary_params),
    ] {
        for param in bucket.1 {
            println!(
                "  param[{}] {} = {} ({})",
                bucket.0,
                param.name,
                param.value.to_display_string(),
                param.type_tag()
            );
        }
    }
    for dataset in container.datasets() {
        println!(
            "  dataset {} rows={} row_bytes={} columns={}",
            dataset.kind().name(),
            dataset.row_count(),
            dataset.row_length(),
            dataset.extra_columns().len()
        );
    }
    for kind_tag in &container.skipped_kinds {
        println!("  dataset <unrecognized kind {}> (skipped)", kind_tag);
    }
}

fn render(entry: &Entry) -> String {
    let mut line = format!("name={}", entry.name());
    match entry {
        Entry::Expression(e) => line.push_str(&format!(" quant={}", e.quantification)),
        Entry::Genotype(e) => line.push_str(&format!(" call={} conf={}", e.call, e.confidence)),
        Entry::CopyNumber(e) => line.push_str(&format!(" chr={} pos={}", e.chr, e.position)),
        Entry::CytoRegion(e) => line.push_str(&format!(
            " chr={} [{}..{}] call={} conf={}",
            e.chr, e.start_position, e.stop_position, e.call, e.confidence
        )),
        Entry::CopyNumberVariation(e) => line.push_str(&format!(
            " signal={} call={} conf={}",
            e.signal, e.call, e.confidence
        )),
        Entry::DmetBiAllelic(e) => line.push_str(&format!(
            " call={} conf={} sigA={} sigB={}",
            e.call, e.confidence, e.signal_a, e.signal_b
        )),
        Entry::DmetMultiAllelic(e) => line.push_str(&format!(
            " call={} conf={} alleles={}",
            e.call, e.confidence, e.allele_count
        )),
        Entry::DmetCopyNumber(e) => line.push_str(&format!(
            " call={} conf={} est={} [{}, {}]",
            e.call, e.confidence, e.estimate, e.lower, e.upper
        )),
    }
    for value in entry.metrics() {
        line.push_str(&format!(" {}", value.to_display_string()));
    }
    line
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let options = parse_args()?;
    for path in &options.paths {
        dump(Path::new(path), &options)
            .with_context(|| format!("failed to dump {path}"))?;
    }
    Ok(())
}
