//! Parameterized chart source templates.
//!
//! Each chart kind has a fixed matplotlib template; labels, values and
//! colors are injected as Python literals (via JSON, which is valid Python
//! for strings and numbers). The emitted source is self-contained: run it
//! and it writes `chart.png` and prints a one-line insight to stdout.

use dg_core::{DataPoint, DiagramKind, GenerateError};

/// Inputs for chart source generation.
#[derive(Debug)]
pub struct ChartInput<'a> {
    /// Chart title (from the request content).
    pub title: &'a str,
    /// Data points; `value` defaults to the point's position when unset.
    pub data_points: &'a [DataPoint],
    /// Fill colors, cycled over series.
    pub colors: &'a [String],
}

impl ChartInput<'_> {
    fn labels(&self) -> Vec<String> {
        self.data_points
            .iter()
            .map(|p| p.label.clone())
            .collect()
    }

    fn values(&self) -> Vec<f64> {
        self.data_points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                #[allow(clippy::cast_precision_loss)]
                p.value.unwrap_or((i + 1) as f64)
            })
            .collect()
    }
}

/// Render Python source for a chart kind.
///
/// # Errors
///
/// [`GenerateError::UnsupportedKind`] for non-chart kinds,
/// [`GenerateError::Invalid`] when no data points were provided.
pub fn render_source(kind: DiagramKind, input: &ChartInput<'_>) -> Result<String, GenerateError> {
    if !kind.is_chart() {
        return Err(GenerateError::UnsupportedKind(kind.as_str().to_owned()));
    }
    if input.data_points.is_empty() {
        return Err(GenerateError::Invalid(
            "chart requests need at least one data point".to_owned(),
        ));
    }

    let labels = py_literal(&input.labels());
    let values = py_literal(&input.values());
    let colors = py_literal(&input.colors.to_vec());
    let title = py_literal(&input.title);

    let plot = plot_body(kind);
    Ok(format!(
        r##"import json
import math

import matplotlib
matplotlib.use("Agg")
import matplotlib.pyplot as plt

labels = {labels}
values = {values}
colors = {colors} or ["#2563EB"]
title = {title}

fig, ax = plt.subplots(figsize=(8, 5), dpi=120)
{plot}
if title:
    ax.set_title(title)
fig.tight_layout()
fig.savefig("chart.png")
print(json.dumps({{"points": len(values), "min": min(values), "max": max(values)}}))
"##
    ))
}

/// JSON literal, which is valid Python for strings, numbers and lists.
fn py_literal<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_owned())
}

fn plot_body(kind: DiagramKind) -> &'static str {
    match kind {
        DiagramKind::Pie => {
            "ax.pie(values, labels=labels, colors=[colors[i % len(colors)] for i in range(len(values))], autopct=\"%1.0f%%\")\n\
             ax.axis(\"equal\")"
        }
        DiagramKind::Bar => {
            "ax.bar(labels, values, color=[colors[i % len(colors)] for i in range(len(values))])\n\
             ax.set_ylabel(\"Value\")"
        }
        DiagramKind::Line => {
            "ax.plot(labels, values, color=colors[0], marker=\"o\", linewidth=2)\n\
             ax.set_ylabel(\"Value\")\n\
             ax.grid(True, alpha=0.3)"
        }
        DiagramKind::Scatter => {
            "ax.scatter(range(len(values)), values, color=colors[0], s=60)\n\
             ax.set_xticks(range(len(labels)))\n\
             ax.set_xticklabels(labels, rotation=30, ha=\"right\")"
        }
        DiagramKind::Histogram => {
            "ax.hist(values, bins=max(3, int(math.sqrt(len(values)))), color=colors[0], edgecolor=\"white\")\n\
             ax.set_ylabel(\"Frequency\")"
        }
        DiagramKind::Heatmap => {
            r#"side = max(1, math.ceil(math.sqrt(len(values))))
grid = [values[r * side:(r + 1) * side] + [0.0] * max(0, (r + 1) * side - len(values)) for r in range(side)]
im = ax.imshow(grid, cmap="viridis")
fig.colorbar(im, ax=ax)"#
        }
        DiagramKind::Area => {
            "ax.fill_between(range(len(values)), values, color=colors[0], alpha=0.45)\n\
             ax.plot(range(len(values)), values, color=colors[0], linewidth=2)\n\
             ax.set_xticks(range(len(labels)))\n\
             ax.set_xticklabels(labels, rotation=30, ha=\"right\")"
        }
        DiagramKind::Waterfall => {
            r#"running = 0.0
for i, v in enumerate(values):
    ax.bar(i, v, bottom=running, color=colors[0] if v >= 0 else colors[-1])
    running += v
ax.set_xticks(range(len(labels)))
ax.set_xticklabels(labels, rotation=30, ha="right")"#
        }
        DiagramKind::Treemap => {
            r#"total = sum(values) or 1.0
remaining = total
x, y, w, h = 0.0, 0.0, 1.0, 1.0
for i, v in enumerate(values):
    frac = v / remaining if remaining else 1.0
    if w >= h:
        rw = min(w * frac, w)
        ax.add_patch(plt.Rectangle((x, y), rw, h, facecolor=colors[i % len(colors)], edgecolor="white"))
        ax.text(x + rw / 2, y + h / 2, labels[i], ha="center", va="center", fontsize=8)
        x += rw
        w -= rw
    else:
        rh = min(h * frac, h)
        ax.add_patch(plt.Rectangle((x, y), w, rh, facecolor=colors[i % len(colors)], edgecolor="white"))
        ax.text(x + w / 2, y + rh / 2, labels[i], ha="center", va="center", fontsize=8)
        y += rh
        h -= rh
    remaining -= v
ax.set_xlim(0, 1)
ax.set_ylim(0, 1)
ax.axis("off")"#
        }
        _ => unreachable!("render_source rejects non-chart kinds"),
    }
}
