use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crime_atlas::{load_boundaries, run, write_maps, PipelineConfig, VERSION};

/// Rows printed in the crime-rate ranking
const RANKING_ROWS: usize = 10;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = PipelineConfig::default();

    println!("📊 Crime Atlas v{} - State-wise Crime Rate", VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Core pipeline
    println!("\n📂 Loading {:?} + {:?}...", config.crime_path, config.population_path);
    let output = match run(&config) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("❌ Pipeline failed at stage '{}'", err.stage());
            eprintln!("   {}", err);
            std::process::exit(1);
        }
    };
    println!("✓ {}", output.report.summary());
    println!("✓ Saved final dataset -> {:?}", config.output_path);

    // 2. Run report
    output.report.write_to(&config.report_path)?;
    println!("✓ Run report -> {:?}", config.report_path);

    // 3. Ranking
    println!("\n🏆 Crime rate per 1 lakh population (top {}):", RANKING_ROWS);
    for (i, record) in output.dataset.ranked_by_rate().iter().take(RANKING_ROWS).enumerate() {
        println!("   {:>2}. {:<28} {:>10.2}", i + 1, record.region, record.crime_rate);
    }

    // 4. Map layers (optional input)
    if config.boundary_path.exists() {
        println!("\n🗺️  Preparing map layers...");
        let features = load_boundaries(&config.boundary_path)?;
        let maps = write_maps(&features, &output.dataset, &config.maps_dir)?;
        println!("✓ Marker layer ({} markers) -> {:?}", maps.markers, maps.marker_path);
        println!(
            "✓ Choropleth layer ({} with data, {} without) -> {:?}",
            maps.matched, maps.unmatched, maps.choropleth_path
        );
    } else {
        println!("\n⚠️  No boundary file at {:?}; map layers skipped", config.boundary_path);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Analysis complete");

    Ok(())
}
