/// Mesh statistics report for the `inspect` command
use std::io::Write;

use anyhow::{Context, Result};
use log::info;
use paramesh_core::build_parametric_mesh;

use crate::config::InspectArgs;

/// Build the requested mesh and print a short report about it
pub fn inspect<W: Write>(args: &InspectArgs, out: &mut W) -> Result<()> {
    let shape = args.shape.shape(args.major, args.minor);
    let mesh = build_parametric_mesh(&shape, args.u, args.v)
        .with_context(|| format!("failed to build {} at {}x{}", shape.name(), args.u, args.v))?;
    info!("inspecting {} mesh", shape.name());

    writeln!(out, "shape:      {}", shape.name())?;
    writeln!(out, "grid:       {}x{}", args.u, args.v)?;
    writeln!(out, "vertices:   {}", mesh.vertex_count())?;
    writeln!(out, "indices:    {}", mesh.index_count())?;
    writeln!(out, "triangles:  {}", mesh.triangle_count())?;
    writeln!(
        out,
        "normals:    {}",
        if shape.has_normal_fn() { "explicit" } else { "estimated" }
    )?;

    let degenerate = mesh.degenerate_normals();
    match degenerate.first() {
        Some(first) => writeln!(
            out,
            "degenerate: {} (first at vertex {first})",
            degenerate.len()
        )?,
        None => writeln!(out, "degenerate: 0")?,
    }

    if let Some((min, max)) = mesh.bounds() {
        writeln!(
            out,
            "bounds:     ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        )?;
    }
    Ok(())
}
