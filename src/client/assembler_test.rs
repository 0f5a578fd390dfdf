use super::*;
use crate::client::test_helpers::RecordingSurface;
use uuid::Uuid;

fn start_at(x: f64, y: f64, tool: Tool) -> StrokeStart {
    StrokeStart { x, y, color: "#abcdef".into(), width: 6.0, tool }
}

// =============================================================
// start / extend
// =============================================================

#[test]
fn start_paints_nothing() {
    let mut assembler = StrokeAssembler::new();
    let author = Uuid::new_v4();
    assembler.start(author, &start_at(1.0, 1.0, Tool::Brush));
    assert!(assembler.is_drawing(&author));
    assert_eq!(assembler.points(&author), Some(&[Point::new(1.0, 1.0)][..]));
}

#[test]
fn extend_paints_incremental_segment() {
    let mut assembler = StrokeAssembler::new();
    let mut surface = RecordingSurface::default();
    let author = Uuid::new_v4();
    assembler.start(author, &start_at(0.0, 0.0, Tool::Brush));

    assert!(assembler.extend(author, Point::new(5.0, 0.0), &mut surface));
    assert!(assembler.extend(author, Point::new(5.0, 5.0), &mut surface));

    assert_eq!(surface.segments.len(), 2);
    assert_eq!(surface.segments[0].from, Point::new(0.0, 0.0));
    assert_eq!(surface.segments[0].to, Point::new(5.0, 0.0));
    assert_eq!(surface.segments[1].from, Point::new(5.0, 0.0));
    assert_eq!(surface.segments[1].blend, Blend::Paint);
    assert_eq!(surface.segments[1].color, "#abcdef");
    assert_eq!(assembler.points(&author).map(<[Point]>::len), Some(3));
}

#[test]
fn eraser_segments_use_destructive_blend() {
    let mut assembler = StrokeAssembler::new();
    let mut surface = RecordingSurface::default();
    let author = Uuid::new_v4();
    assembler.start(author, &start_at(0.0, 0.0, Tool::Eraser));
    assembler.extend(author, Point::new(1.0, 1.0), &mut surface);
    assert_eq!(surface.segments[0].blend, Blend::Erase);
}

#[test]
fn extend_without_open_stroke_is_dropped() {
    let mut assembler = StrokeAssembler::new();
    let mut surface = RecordingSurface::default();
    assert!(!assembler.extend(Uuid::new_v4(), Point::new(1.0, 1.0), &mut surface));
    assert!(surface.segments.is_empty());
    assert_eq!(assembler.open_count(), 0);
}

#[test]
fn restart_replaces_open_stroke() {
    let mut assembler = StrokeAssembler::new();
    let mut surface = RecordingSurface::default();
    let author = Uuid::new_v4();
    assembler.start(author, &start_at(0.0, 0.0, Tool::Brush));
    assembler.extend(author, Point::new(9.0, 9.0), &mut surface);
    assembler.start(author, &start_at(3.0, 3.0, Tool::Eraser));

    assert_eq!(assembler.open_count(), 1);
    assert_eq!(assembler.points(&author), Some(&[Point::new(3.0, 3.0)][..]));
}

#[test]
fn authors_are_tracked_independently() {
    let mut assembler = StrokeAssembler::new();
    let mut surface = RecordingSurface::default();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    assembler.start(a, &start_at(0.0, 0.0, Tool::Brush));
    assembler.start(b, &start_at(100.0, 100.0, Tool::Brush));
    assembler.extend(a, Point::new(1.0, 0.0), &mut surface);
    assembler.extend(b, Point::new(101.0, 100.0), &mut surface);

    assert_eq!(surface.segments[0].from, Point::new(0.0, 0.0));
    assert_eq!(surface.segments[1].from, Point::new(100.0, 100.0));
}

// =============================================================
// finish / discard
// =============================================================

#[test]
fn finish_builds_operation_with_server_id() {
    let mut assembler = StrokeAssembler::new();
    let mut surface = RecordingSurface::default();
    let author = Uuid::new_v4();
    let operation_id = Uuid::new_v4();
    assembler.start(author, &start_at(0.0, 0.0, Tool::Eraser));
    assembler.extend(author, Point::new(2.0, 2.0), &mut surface);

    let op = assembler.finish(author, operation_id).expect("open stroke");
    assert_eq!(op.id, operation_id);
    assert_eq!(op.user_id, author);
    assert_eq!(op.stroke.tool, Tool::Eraser);
    assert_eq!(op.stroke.points, vec![Point::new(0.0, 0.0), Point::new(2.0, 2.0)]);
    assert!(!assembler.is_drawing(&author));
}

#[test]
fn finish_without_open_stroke_is_none() {
    let mut assembler = StrokeAssembler::new();
    assert!(assembler.finish(Uuid::new_v4(), Uuid::new_v4()).is_none());
}

#[test]
fn discard_drops_open_stroke() {
    let mut assembler = StrokeAssembler::new();
    let author = Uuid::new_v4();
    assembler.start(author, &start_at(0.0, 0.0, Tool::Brush));
    assert!(assembler.discard(&author));
    assert!(!assembler.discard(&author));
    assert!(assembler.finish(author, Uuid::new_v4()).is_none());
}

// =============================================================
// draw_stroke
// =============================================================

#[test]
fn draw_stroke_paints_consecutive_pairs() {
    let mut surface = RecordingSurface::default();
    let stroke = Stroke {
        tool: Tool::Brush,
        color: "#000".into(),
        width: 1.0,
        points: vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(2.0, 0.0)],
    };
    draw_stroke(&mut surface, &stroke);
    assert_eq!(surface.segments.len(), 2);
}

#[test]
fn draw_stroke_single_point_paints_nothing() {
    let mut surface = RecordingSurface::default();
    let stroke = Stroke { tool: Tool::Brush, color: "#000".into(), width: 1.0, points: vec![Point::default()] };
    draw_stroke(&mut surface, &stroke);
    assert!(surface.segments.is_empty());
}
