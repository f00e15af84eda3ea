//! Pictures for the narration: a grid of sample images and the loss curve

use std::{error::Error, path::Path};

use plotters::{
    chart::ChartBuilder,
    prelude::{BitMapBackend, Circle, IntoDrawingArea, Rectangle},
    series::LineSeries,
    style::{BLUE, Color, RGBColor, WHITE},
};
use thiserror::Error;

use crate::{datasets::ImageSet, train::TrainingHistory};

const CELL_SIZE: u32 = 120;

/// Errors for the plots
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Failed to draw '{file}': {message}")]
    Draw { file: String, message: String },
    #[error("Nothing to plot")]
    Empty,
}

fn draw_error(file: &Path) -> impl Fn(Box<dyn Error>) -> PlotError + '_ {
    move |e| PlotError::Draw {
        file: file.display().to_string(),
        message: e.to_string(),
    }
}

fn class_name(set: &ImageSet, label: usize) -> String {
    set.class_names
        .get(label)
        .cloned()
        .unwrap_or_else(|| label.to_string())
}

/// Draws the first `n` images of the set in a grid, captioned with their class.
///
/// When `predictions` is given, captions read `true / predicted`.
pub fn plot_samples(
    set: &ImageSet,
    n: usize,
    predictions: Option<&[usize]>,
    file: &Path,
) -> Result<(), PlotError> {
    let n = n.min(set.len());
    if n == 0 {
        return Err(PlotError::Empty);
    }
    draw_samples(set, n, predictions, file).map_err(draw_error(file))?;
    log::info!("Sample images saved to '{}'.", file.display());
    Ok(())
}

fn draw_samples(
    set: &ImageSet,
    n: usize,
    predictions: Option<&[usize]>,
    file: &Path,
) -> Result<(), Box<dyn Error>> {
    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = n.div_ceil(cols);
    let root_area = BitMapBackend::new(file, (cols as u32 * CELL_SIZE, rows as u32 * CELL_SIZE))
        .into_drawing_area();
    root_area.fill(&WHITE)?;

    let (w, h) = (set.width as i32, set.height as i32);
    let cells = root_area.split_evenly((rows, cols));
    for (i, (cell, item)) in cells.iter().zip(set.items.iter().take(n)).enumerate() {
        let caption = match predictions.and_then(|p| p.get(i)) {
            Some(&pred) => format!(
                "{} / {}",
                class_name(set, item.label),
                class_name(set, pred)
            ),
            None => class_name(set, item.label),
        };
        let mut chart = ChartBuilder::on(cell)
            .caption(caption, ("sans-serif", 14))
            .margin(4)
            .build_cartesian_2d(0..w, 0..h)?;

        // images are normalized, rescale each one to the full gray range
        let lo = item.pixels.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = item.pixels.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let span = (hi - lo).max(f32::EPSILON);
        chart.draw_series(item.pixels.iter().enumerate().map(|(idx, &p)| {
            let x = (idx % set.width) as i32;
            let y = (idx / set.width) as i32;
            let v = (255.0 * (p - lo) / span).round().clamp(0.0, 255.0) as u8;
            // row 0 is the top of the image
            Rectangle::new([(x, h - y - 1), (x + 1, h - y)], RGBColor(v, v, v).filled())
        }))?;
    }

    root_area.present()?;
    Ok(())
}

/// Plots the running average loss against the number of batches seen
pub fn plot_loss_curve(
    history: &TrainingHistory,
    title: &str,
    file: &Path,
) -> Result<(), PlotError> {
    if history.points.is_empty() {
        return Err(PlotError::Empty);
    }
    draw_loss_curve(&history.points, title, file).map_err(draw_error(file))?;
    log::info!("Loss curve saved to '{}'.", file.display());
    Ok(())
}

fn draw_loss_curve(points: &[(usize, f32)], title: &str, file: &Path) -> Result<(), Box<dyn Error>> {
    let root_area = BitMapBackend::new(file, (640, 480)).into_drawing_area();
    root_area.fill(&WHITE)?;

    let max_x = points.iter().map(|(x, _)| *x).max().unwrap_or(1).max(1) as f32;
    let max_y = points
        .iter()
        .map(|(_, y)| *y)
        .filter(|y| y.is_finite())
        .fold(0.0f32, f32::max)
        .max(1e-3)
        * 1.1;

    let mut chart = ChartBuilder::on(&root_area)
        .caption(title, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0f32..max_x, 0f32..max_y)?;

    chart
        .configure_mesh()
        .x_desc("batches")
        .y_desc("running loss")
        .draw()?;

    chart.draw_series(LineSeries::new(
        points.iter().map(|&(x, y)| (x as f32, y)),
        &BLUE,
    ))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x as f32, y), 2, BLUE.filled())),
    )?;

    root_area.present()?;
    Ok(())
}
