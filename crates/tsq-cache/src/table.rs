//! Time-ordered column operations used to extend and clip cached frames
//!
//! A table is the column set of one frame: the time column first, then the
//! value columns, all of equal length.

use arrow::array::{ArrayRef, UInt32Array};
use arrow::compute::{concat, take};
use tsq_core::{time_values_ms, QueryError, Result};

fn time_column(table: &[ArrayRef]) -> Result<Vec<i64>> {
    let time = table
        .first()
        .ok_or_else(|| QueryError::SchemaError("table has no time column".to_string()))?;
    time_values_ms(time.as_ref())
}

/// Row order that sorts `times` ascending, stable for equal timestamps
fn sorted_order(times: &[i64]) -> Vec<u32> {
    let mut order: Vec<u32> = (0..times.len() as u32).collect();
    if !times.windows(2).all(|w| w[0] <= w[1]) {
        order.sort_by_key(|&i| times[i as usize]);
    }
    order
}

fn take_rows(table: &[ArrayRef], indices: &UInt32Array) -> Result<Vec<ArrayRef>> {
    table
        .iter()
        .map(|column| Ok(take(column.as_ref(), indices, None)?))
        .collect()
}

/// Sort a table by its time column
pub fn sort_by_time(table: &[ArrayRef]) -> Result<Vec<ArrayRef>> {
    let times = time_column(table)?;
    if times.windows(2).all(|w| w[0] <= w[1]) {
        return Ok(table.to_vec());
    }
    let indices = UInt32Array::from_iter_values(sorted_order(&times));
    take_rows(table, &indices)
}

/// Merge a fresh table into a previous one by time.
///
/// The fresh table is authoritative for the span it covers: previous rows
/// before its first timestamp and after its last timestamp are kept, every
/// fresh row is kept, and previous rows inside the fresh span are dropped.
/// `prev` must already be sorted; `next` is sorted here if needed.
pub fn amend(prev: &[ArrayRef], next: &[ArrayRef]) -> Result<Vec<ArrayRef>> {
    if prev.len() != next.len() {
        return Err(QueryError::SchemaError(format!(
            "cannot amend a {}-column table with a {}-column table",
            prev.len(),
            next.len()
        )));
    }

    let prev_times = time_column(prev)?;
    let next_times = time_column(next)?;

    if next_times.is_empty() {
        return Ok(prev.to_vec());
    }
    if prev_times.is_empty() {
        return sort_by_time(next);
    }

    let order = sorted_order(&next_times);
    let next_start = next_times[order[0] as usize];
    let next_end = next_times[order[order.len() - 1] as usize];

    let head = prev_times.partition_point(|t| *t < next_start);
    let tail = prev_times.partition_point(|t| *t <= next_end);
    let offset = prev_times.len() as u32;

    let joined = prev
        .iter()
        .zip(next)
        .map(|(p, n)| Ok(concat(&[p.as_ref(), n.as_ref()])?))
        .collect::<Result<Vec<ArrayRef>>>()?;

    // Plain append: nothing overlaps and the fresh rows are already ordered
    if head == prev_times.len() && order.windows(2).all(|w| w[0] < w[1]) {
        return Ok(joined);
    }

    let indices = UInt32Array::from_iter_values(
        (0..head as u32)
            .chain(order.iter().map(|i| i + offset))
            .chain(tail as u32..offset),
    );
    take_rows(&joined, &indices)
}

/// Clip a sorted table to rows with `from <= time <= to`.
///
/// Clipped tables are copied into new buffers so trimmed rows are released.
pub fn trim(table: &[ArrayRef], from: i64, to: i64) -> Result<Vec<ArrayRef>> {
    let times = time_column(table)?;
    let start = times.partition_point(|t| *t < from);
    let end = times.partition_point(|t| *t <= to).max(start);

    if start == 0 && end == times.len() {
        return Ok(table.to_vec());
    }

    let indices = UInt32Array::from_iter_values(start as u32..end as u32);
    take_rows(table, &indices)
}
