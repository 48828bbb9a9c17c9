// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::arc_with_non_send_sync,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_unit_value,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::bytes_nth,
    clippy::deprecated_clippy_cfg_attr,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

use anyhow::Context;
use clap::Parser;
use gtfs_structures::Gtfs;
use tsl_zones::config::EngineConfig;
use tsl_zones::geojson_io::{GeoJsonSource, GeoJsonZoneWriter, SourceLocation};
use tsl_zones::models::{Agency, DatasetId};
use tsl_zones::pipeline::ZonePipeline;
use tsl_zones::station_hierarchy::GtfsStationFeed;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Derives the three parking-mandate regulatory zones from transit and zoning data"
)]
struct Args {
    /// static GTFS archive (zip or directory) for the city rail operator
    #[arg(long)]
    rail_gtfs: String,
    /// static GTFS archive for the commuter rail operator
    #[arg(long)]
    commuter_gtfs: String,
    /// bus corridor coverage polygons, GeoJSON path or URL
    #[arg(long)]
    corridors: String,
    /// zoning district polygons, GeoJSON path or URL
    #[arg(long)]
    districts: String,
    /// jurisdiction boundary polygon, GeoJSON path or URL
    #[arg(long)]
    boundary: String,
    /// feature property holding the zoning class code
    #[arg(long, default_value = "zone_class")]
    district_class_property: String,
    /// output GeoJSON path
    #[arg(long, default_value = "tsl_zones.geojson")]
    out: String,
    /// engine config as JSON, missing keys take defaults
    #[arg(long)]
    config: Option<String>,
    /// override both station buffer radii, in feet
    #[arg(long)]
    radius_feet: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let body = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {path}"))?;
            serde_json::from_str::<EngineConfig>(&body)
                .with_context(|| format!("parsing config {path}"))?
        }
        None => EngineConfig::default(),
    };
    if let Some(radius_feet) = args.radius_feet {
        config.rail_buffer_feet = radius_feet;
        config.commuter_buffer_feet = radius_feet;
    }

    let source = GeoJsonSource::new(
        &args.district_class_property,
        config.fetch_attempts,
        config.fetch_timeout_secs,
    )
    .with_location(
        DatasetId::BusCorridors,
        SourceLocation::parse(&args.corridors),
    )
    .with_location(
        DatasetId::ZoningDistricts,
        SourceLocation::parse(&args.districts),
    )
    .with_location(
        DatasetId::CityBoundary,
        SourceLocation::parse(&args.boundary),
    );

    println!("Reading GTFS feeds");
    let rail_gtfs =
        Gtfs::new(&args.rail_gtfs).with_context(|| format!("reading GTFS {}", args.rail_gtfs))?;
    let commuter_gtfs = Gtfs::new(&args.commuter_gtfs)
        .with_context(|| format!("reading GTFS {}", args.commuter_gtfs))?;
    let feed = GtfsStationFeed::new()
        .with_feed(Agency::CityRail, rail_gtfs)
        .with_feed(Agency::CommuterRail, commuter_gtfs);

    let mut consumer = GeoJsonZoneWriter::new(&args.out);
    let pipeline = ZonePipeline::new(config);
    let output = pipeline.run(&source, &feed, &mut consumer).await?;

    let report = output.stats.rounded();
    println!();
    println!(
        "Run {} finished in {:?} (rail: {}, commuter: {})",
        output.run_id, output.elapsed, output.rail_hierarchy, output.commuter_hierarchy
    );
    println!("{:<52} {:>10} {:>8}", "zone", "sq mi", "share");
    for stat in &report.per_zone {
        println!(
            "{:<52} {:>10.1} {:>7.1}%",
            stat.category.label(),
            stat.area_sq_mi,
            stat.share_pct
        );
    }
    println!("{:<52} {:>10.1}", "city total", report.city_area_sq_mi);
    println!("Zones written to {}", args.out);

    Ok(())
}
