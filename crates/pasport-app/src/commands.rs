// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command handlers — run one parsed command against the services and print
// the outcome.

use std::path::Path;

use image::ImageFormat;
use pasport_core::error::{PasportError, Result};
use pasport_core::human_errors::humanize_error;
use pasport_core::types::{Offset, Transform};
use pasport_document::ExportOptions;
use tracing::info;

use crate::cli::{CardCommand, Command, ExportArgs, PreviewArgs, SettingsCommand, SlotCommand};
use crate::services::app_services::{AppServices, SlotEdit};

/// Output formats chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Pdf,
    Png,
}

fn output_format(path: &Path) -> Result<OutputFormat> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => Ok(OutputFormat::Pdf),
        Some("png") => Ok(OutputFormat::Png),
        _ => Err(PasportError::InvalidSettings(format!(
            "output file {} must end in .pdf or .png",
            path.display()
        ))),
    }
}

pub fn run(svc: &mut AppServices, cmd: Command) -> Result<()> {
    match cmd {
        Command::Card(card) => run_card(svc, card),
        Command::Slot(slot) => run_slot(svc, slot),
        Command::Export(args) => run_export(svc, args),
        Command::Preview(args) => run_preview(svc, args),
        Command::Settings(settings) => run_settings(svc, settings),
        Command::Backup { path } => {
            svc.backup(&path)?;
            println!("Database copied to {}", path.display());
            Ok(())
        }
    }
}

fn run_card(svc: &mut AppServices, cmd: CardCommand) -> Result<()> {
    match cmd {
        CardCommand::List => {
            let cards = svc.list_cards()?;
            if cards.is_empty() {
                println!("No cards yet. Create one with `pasport card add <name>`.");
            }
            for card in cards {
                println!(
                    "{}\t(updated {})",
                    card.name,
                    card.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        CardCommand::Show { name } => {
            let card = svc.load_card(&name)?;
            println!("{}", card.name);
            for slot in &card.slots {
                match &slot.content {
                    Some(content) => println!(
                        "{:>2}  {:<20} {}  zoom {:.2}  rotate {:.1}  offset ({:.3}, {:.3})",
                        slot.index,
                        slot.label(),
                        content.image,
                        content.transform.scale,
                        content.transform.rotation,
                        content.transform.offset.x,
                        content.transform.offset.y,
                    ),
                    None => println!("{:>2}  {:<20} -", slot.index, slot.label()),
                }
            }
        }
        CardCommand::Add { name } => {
            let card = svc.create_card(&name)?;
            println!("Created card {}", card.name);
        }
        CardCommand::Rename { old, new } => {
            svc.rename_card(&old, &new)?;
            println!("Renamed {old} to {new}");
        }
        CardCommand::Delete { name } => {
            svc.delete_card(&name)?;
            println!("Deleted card {name}");
        }
    }
    Ok(())
}

fn run_slot(svc: &mut AppServices, cmd: SlotCommand) -> Result<()> {
    match cmd {
        SlotCommand::Set(args) => {
            let transform = Transform {
                offset: Offset {
                    x: args.offset_x,
                    y: args.offset_y,
                },
                scale: args.zoom,
                rotation: args.rotate,
                crop_aspect: args.aspect,
            };
            let image = svc.set_slot(&args.card, args.index, &args.image, &transform)?;
            println!("Slot {} of {} now shows image {image}", args.index, args.card);
        }
        SlotCommand::Clear { card, index } => {
            svc.clear_slot(&card, index)?;
            println!("Slot {index} of {card} cleared");
        }
        SlotCommand::Rotate {
            card,
            index,
            degrees,
        } => {
            let edit = svc.edit_slot(&card, index, |t| t.rotated_by(degrees))?;
            println!("Slot {index} rotation is now {:.1}°", edit.transform.rotation);
            report_white_edges(edit);
        }
        SlotCommand::Zoom {
            card,
            index,
            notches,
        } => {
            let edit = svc.edit_slot(&card, index, |t| t.wheel_zoomed(notches))?;
            println!("Slot {index} zoom is now {:.2}x", edit.transform.scale);
            report_white_edges(edit);
        }
        SlotCommand::Pan {
            card,
            index,
            dx,
            dy,
        } => {
            let edit = svc.edit_slot(&card, index, |t| t.panned_by(dx, dy))?;
            println!(
                "Slot {index} offset is now ({:.3}, {:.3})",
                edit.transform.offset.x, edit.transform.offset.y
            );
            report_white_edges(edit);
        }
    }
    Ok(())
}

fn report_white_edges(edit: SlotEdit) {
    if !edit.covers_slot {
        eprintln!("note: the framing runs off the photo; the slot will print with white edges");
    }
}

fn run_export(svc: &mut AppServices, args: ExportArgs) -> Result<()> {
    let format = output_format(&args.out)?;
    let options = ExportOptions {
        parallel: !args.sequential,
        threads: args.threads,
    };
    let page = svc.export(&args.card, args.dpi, options)?;

    for (slot, image) in &page.report.missing {
        let human = humanize_error(&PasportError::MissingSourceImage(image.clone()));
        eprintln!("warning: slot {slot}: {} {}", human.message, human.suggestion);
    }

    match format {
        OutputFormat::Pdf => page.write_pdf(&args.out)?,
        OutputFormat::Png => page.save_png(&args.out)?,
    }
    println!(
        "Exported {} ({} photos, {} DPI) to {}",
        page.title,
        page.report.rendered.len(),
        page.dpi,
        args.out.display()
    );
    Ok(())
}

fn run_preview(svc: &mut AppServices, args: PreviewArgs) -> Result<()> {
    if output_format(&args.out)? != OutputFormat::Png {
        return Err(PasportError::InvalidSettings(
            "previews are written as PNG".into(),
        ));
    }
    let preview = svc.preview_slot(&args.card, args.index, args.max_edge)?;
    preview
        .save_with_format(&args.out, ImageFormat::Png)
        .map_err(|e| PasportError::ImageError(format!("failed to write preview: {e}")))?;
    info!(path = %args.out.display(), "preview written");
    println!(
        "Preview {}x{} written to {}",
        preview.width(),
        preview.height(),
        args.out.display()
    );
    Ok(())
}

fn run_settings(svc: &mut AppServices, cmd: SettingsCommand) -> Result<()> {
    match cmd {
        SettingsCommand::Show => {
            println!("{}", serde_json::to_string_pretty(svc.settings())?);
        }
        SettingsCommand::SetDpi { dpi } => {
            svc.set_export_dpi(dpi)?;
            println!("Export resolution set to {dpi} DPI");
        }
        SettingsCommand::SetAspect { aspect } => {
            svc.set_default_aspect(aspect)?;
            println!("Default crop aspect set to {aspect}");
        }
        SettingsCommand::SetBorders { enabled } => {
            svc.set_cell_borders(enabled)?;
            println!(
                "Cell borders {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
    }
    Ok(())
}
