use clap::Parser;
use pidedge::config::RoutingConfig;
use pidedge::diagram::Diagram;
use pidedge::offset::{BoundaryDepthTable, DepthSource};
use pidedge::svg::SvgRenderer;
use std::path::PathBuf;

/// Render a P&ID diagram export to SVG or PNG
#[derive(Parser, Debug)]
#[command(name = "pidedge")]
#[command(about = "Render exported P&ID diagrams with flush-routed edges", long_about = None)]
struct Args {
    /// Diagram JSON exported by the editor (use "-" for stdin)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file path (extension determines format: .svg or .png)
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Routing configuration (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Measured boundary depths, `{"node-id": {"right": 10.5}}`
    #[arg(short, long, value_name = "DEPTHS")]
    depths: Option<PathBuf>,

    /// Raster scale multiplier for PNG output
    #[arg(long, default_value_t = 1.0)]
    png_scale: f32,
}

fn main() -> Result<(), String> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read config file: {}", e))?;
            RoutingConfig::from_toml_str(&content).map_err(|e| e.to_string())?
        }
        None => RoutingConfig::default(),
    };

    let depths = match &args.depths {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read depths file: {}", e))?;
            let table: BoundaryDepthTable = serde_json::from_str(&content)
                .map_err(|e| format!("Invalid depths file: {}", e))?;
            Some(table)
        }
        None => None,
    };

    let source = if args.input.to_str() == Some("-") {
        let mut buffer = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        buffer
    } else {
        std::fs::read_to_string(&args.input)
            .map_err(|e| format!("Failed to read input file: {}", e))?
    };

    let diagram = Diagram::parse_json(&source).map_err(|e| e.to_string())?;
    let svg = SvgRenderer::new(config).render(
        &diagram,
        depths.as_ref().map(|d| d as &dyn DepthSource),
    );

    let output_ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .ok_or("Output file has no extension")?
        .to_ascii_lowercase();

    match output_ext.as_str() {
        "svg" => {
            std::fs::write(&args.output, svg).map_err(|e| format!("Failed to write SVG: {}", e))?;
            eprintln!("SVG saved to: {}", args.output.display());
        }
        #[cfg(feature = "png")]
        "png" => {
            let png_data =
                pidedge::export::svg_to_png(&svg, args.png_scale).map_err(|e| e.to_string())?;
            std::fs::write(&args.output, png_data)
                .map_err(|e| format!("Failed to write PNG: {}", e))?;
            eprintln!("PNG saved to: {}", args.output.display());
        }
        _ => {
            return Err(format!(
                "Unsupported output format: .{} (use .svg or .png)",
                output_ext
            ));
        }
    }

    Ok(())
}
