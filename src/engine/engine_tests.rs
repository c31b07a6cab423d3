//! Unit tests for the scroll engine, driven through its public API with
//! hand-built measurements.

use super::*;
use crate::config::MediaQuery;
use crate::model::{GatewayError, Page, PageArgs, PageInfo, QueryType};

// ===== Test Helpers =====

#[derive(Debug, Clone, PartialEq, Eq)]
struct Post {
    id: u32,
}

impl Identify for Post {
    type Id = u32;

    fn item_id(&self) -> u32 {
        self.id
    }
}

const ROW: i64 = 60;
const WIDTH: i64 = 400;

fn posts(ids: Range<u32>) -> Vec<Post> {
    ids.map(|id| Post { id }).collect()
}

fn info(has_more: bool, more_offset: i64, token: &str) -> PageInfo {
    PageInfo {
        has_more,
        has_new: false,
        count_new: 0,
        more_offset,
        next_offset_relative_to: token.to_string(),
    }
}

fn page(ids: Range<u32>, info: PageInfo) -> Page<Post> {
    Page {
        nodes: posts(ids),
        info,
    }
}

fn config(page_size: usize) -> EngineConfig {
    EngineConfig {
        page_size,
        ..EngineConfig::default()
    }
}

fn engine(page_size: usize) -> ScrollEngine<Post> {
    ScrollEngine::new(config(page_size), Viewport::new(WIDTH, 300))
}

/// Drain effects and return the only query among them.
fn take_query(engine: &mut ScrollEngine<Post>) -> PageRequest {
    let queries: Vec<PageRequest> = engine
        .take_effects()
        .into_iter()
        .filter_map(|effect| match effect {
            Effect::Query(request) => Some(request),
            _ => None,
        })
        .collect();
    assert_eq!(queries.len(), 1, "expected exactly one query");
    queries.into_iter().next().unwrap()
}

fn finished(effects: &[Effect]) -> Vec<(JobId, JobOutcome)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::JobFinished { job, outcome } => Some((*job, *outcome)),
            _ => None,
        })
        .collect()
}

fn scroll_targets(effects: &[Effect]) -> Vec<i64> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::ScrollTo { y } => Some(*y),
            _ => None,
        })
        .collect()
}

/// Mount an engine and answer its first load with `ids`.
fn loaded(page_size: usize, ids: Range<u32>, info: PageInfo) -> ScrollEngine<Post> {
    let mut engine = engine(page_size);
    engine.mount();
    let request = take_query(&mut engine);
    engine.complete(request.id, Ok(Some(page(ids, info)))).unwrap();
    engine.take_effects();
    engine
}

/// Single-column layout where item `ids[k]` sits `k` rows below `first_top`.
fn column(ids: impl IntoIterator<Item = u32>, first_top: i64) -> HashMap<u32, ItemRect> {
    ids.into_iter()
        .enumerate()
        .map(|(k, id)| (id, ItemRect::new(first_top + k as i64 * ROW, ROW, WIDTH)))
        .collect()
}

fn mount_all(engine: &mut ScrollEngine<Post>, ids: impl IntoIterator<Item = u32>) {
    for id in ids {
        engine.item_mounted(id);
    }
}

// ===== Initial load =====

#[test]
fn mount_requests_one_window_from_the_top() {
    let mut engine = engine(7);
    engine.mount();

    let effects = engine.take_effects();
    assert_eq!(effects.last(), Some(&Effect::Rerender));
    let Some(Effect::Query(request)) = effects.first() else {
        panic!("expected a query first, got {effects:?}");
    };
    assert_eq!(request.query_type, QueryType::PageLoad);
    assert_eq!(request.args.offset, 0);
    assert_eq!(request.args.limit, 7);
    assert_eq!(request.args.offset_relative_to, None);
    assert_eq!(engine.snapshot().in_flight, Some("page_load"));
}

#[test]
fn page_load_renders_first_window() {
    let mut engine = engine(7);
    let job = engine.mount();
    let request = take_query(&mut engine);
    engine
        .complete(request.id, Ok(Some(page(0..7, info(true, 7, "0")))))
        .unwrap();

    let effects = engine.take_effects();
    assert_eq!(finished(&effects), vec![(job, JobOutcome::Completed)]);
    assert_eq!(effects.last(), Some(&Effect::Rerender));
    assert_eq!(engine.items().len(), 7);
    assert_eq!(engine.rendered_items().len(), 7);
    assert_eq!(engine.render_start(), 0);
    assert_eq!(engine.anchor(), Some("0"));
    assert_eq!(engine.more_offset(), 7);
    assert!(!engine.loaded_with_query_params());
}

#[test]
fn empty_anchor_token_leaves_engine_unanchored() {
    let engine = loaded(5, 0..0, info(false, 0, ""));
    assert_eq!(engine.anchor(), None);
    assert_eq!(engine.url_params(), None);
    assert!(engine.rendered_items().is_empty());
}

#[test]
fn render_summary_lists_window_slots() {
    let engine = loaded(3, 0..3, info(true, 3, "0"));
    insta::assert_snapshot!(engine.render().summary(), @r"
    container min_height=0 columns=1 gap=0
    flags more=true new=false count_new=0 refreshing_more=false refreshing_new=false pull=0
    #0 k2-0 grid 1/1 ty=0
    #1 k2-1 grid 2/1 ty=0
    #2 k2-2 grid 3/1 ty=0
    ");
}

// ===== Load more =====

#[test]
fn load_more_fills_to_page_boundary() {
    let mut engine = loaded(7, 0..7, info(true, 7, "0"));
    engine.load_more();

    let request = take_query(&mut engine);
    assert_eq!(request.query_type, QueryType::LoadMore);
    assert_eq!(request.args.offset, 7);
    assert_eq!(request.args.limit, 7);
    assert_eq!(request.args.offset_relative_to.as_deref(), Some("0"));
    assert_eq!(request.args.count_loaded, 7);

    engine
        .complete(request.id, Ok(Some(page(7..14, info(true, 14, "0")))))
        .unwrap();
    assert_eq!(engine.items().len(), 14);
    assert_eq!(engine.more_offset(), 14);
    // The window does not move by itself
    assert_eq!(engine.render_start(), 0);
    assert_eq!(engine.rendered_items().len(), 7);
}

#[test]
fn partial_page_is_topped_up_to_boundary() {
    let mut engine = loaded(7, 0..7, info(true, 7, "0"));
    engine.load_more();
    let request = take_query(&mut engine);
    engine
        .complete(request.id, Ok(Some(page(7..10, info(true, 10, "0")))))
        .unwrap();
    engine.take_effects();

    engine.load_more();
    let request = take_query(&mut engine);
    assert_eq!(request.args.offset, 10);
    assert_eq!(request.args.limit, 4);
}

#[test]
fn overlapping_load_more_skips_known_items() {
    let mut engine = loaded(7, 0..7, info(true, 7, "0"));
    let args = PageArgs {
        offset: 5,
        limit: 7,
        count_new_limit: 100,
        orderings: Vec::new(),
        count_loaded: 7,
        offset_relative_to: Some("0".to_string()),
    };
    engine.apply_load_more(&args, page(5..12, info(true, 12, "0")));

    let ids: Vec<u32> = engine.items().iter().map(|p| p.id).collect();
    assert_eq!(ids, (0..12).collect::<Vec<_>>());
    assert_eq!(engine.more_offset(), 12);
}

#[test]
fn load_more_never_moves_offset_backwards() {
    let mut engine = loaded(7, 0..7, info(true, 7, "0"));
    let args = PageArgs {
        offset: 7,
        limit: 7,
        count_new_limit: 100,
        orderings: Vec::new(),
        count_loaded: 7,
        offset_relative_to: Some("0".to_string()),
    };
    engine.apply_load_more(&args, page(7..9, info(false, 3, "0")));
    assert_eq!(engine.more_offset(), 7);
    assert_eq!(engine.items().len(), 9);
}

// ===== Load new =====

fn with_new(count_new: usize) -> PageInfo {
    PageInfo {
        has_new: true,
        count_new,
        ..info(true, 7, "10")
    }
}

#[test]
fn load_new_prepends_and_keeps_window_on_same_items() {
    let mut engine = loaded(7, 10..17, with_new(3));
    let keys_before = engine.keys().to_vec();
    engine.load_new();

    let request = take_query(&mut engine);
    assert_eq!(request.query_type, QueryType::LoadNew);
    assert_eq!(request.args.offset, -3);
    assert_eq!(request.args.limit, 3);

    engine
        .complete(request.id, Ok(Some(page(7..10, info(false, 3, "7")))))
        .unwrap();

    assert_eq!(engine.items().len(), 10);
    assert_eq!(engine.items()[3].id, 10);
    assert_eq!(engine.render_start(), 3);
    assert_eq!(engine.rendered_items()[0].id, 10);
    assert_eq!(engine.keys(), keys_before.as_slice());
    assert_eq!(engine.anchor(), Some("7"));
    assert_eq!(engine.more_offset(), 10);
    assert_eq!(engine.direction(), ScrollDirection::Up);

    let info = engine.page_info().unwrap();
    assert!(!info.has_new);
    // has_more is not the server's to change on a prepend
    assert!(info.has_more);
}

#[test]
fn load_new_asks_for_at_most_one_window() {
    let mut engine = loaded(7, 10..17, with_new(50));
    engine.load_new();
    let request = take_query(&mut engine);
    assert_eq!(request.args.offset, -7);
    assert_eq!(request.args.limit, 7);
}

#[test]
fn load_new_respects_count_new_limit() {
    let mut engine = ScrollEngine::new(
        EngineConfig {
            count_new_limit: 2,
            ..config(7)
        },
        Viewport::new(WIDTH, 300),
    );
    engine.mount();
    let request = take_query(&mut engine);
    engine
        .complete(request.id, Ok(Some(page(10..17, with_new(5)))))
        .unwrap();
    engine.take_effects();

    engine.load_new();
    let request = take_query(&mut engine);
    assert_eq!(request.args.limit, 2);
    assert_eq!(request.args.count_new_limit, 2);
}

#[test]
fn load_new_off_row_grid_snaps_and_relayouts() {
    let mut engine = ScrollEngine::new(
        EngineConfig {
            max_items_per_row: Some(3),
            ..config(2)
        },
        Viewport::new(900, 300),
    );
    engine.mount();
    let request = take_query(&mut engine);
    engine
        .complete(request.id, Ok(Some(page(10..16, with_new(2)))))
        .unwrap();
    engine.take_effects();
    let keys_before = engine.keys().to_vec();

    engine.load_new();
    let request = take_query(&mut engine);
    engine
        .complete(request.id, Ok(Some(page(8..10, info(false, 2, "8")))))
        .unwrap();

    // Logical start 2 snaps to 0; the old first item keeps its key
    assert_eq!(engine.render_start(), 0);
    assert_eq!(engine.keys()[2], keys_before[0]);
    assert!(engine.has_pending_relayout());
}

// ===== Resize =====

fn responsive() -> EngineConfig {
    EngineConfig {
        max_items_per_row: Some(3),
        media_queries: vec![MediaQuery {
            max_width: 600,
            items_per_row: 1,
        }],
        ..config(7)
    }
}

#[test]
fn resize_to_more_columns_snaps_window_start() {
    let mut engine = ScrollEngine::new(responsive(), Viewport::new(500, 300));
    engine.mount();
    let request = take_query(&mut engine);
    engine
        .complete(request.id, Ok(Some(page(10..30, with_new(5)))))
        .unwrap();
    engine.load_new();
    let request = take_query(&mut engine);
    engine
        .complete(request.id, Ok(Some(page(5..10, info(false, 5, "5")))))
        .unwrap();
    assert_eq!(engine.render_start(), 5);
    engine.take_effects();

    engine.on_resize(Viewport::new(1000, 300)).unwrap();

    assert_eq!(engine.items_per_row(), 3);
    assert_eq!(engine.render_start(), 3);
    assert_eq!(engine.count_rendered(), 21);
    assert_eq!(engine.keys().len(), 21);
    assert_eq!(engine.min_height(), 0);
    assert_eq!(engine.translate_y(), 0);
    assert!(engine.has_pending_relayout());
    assert_eq!(engine.take_effects(), vec![Effect::Rerender]);
}

#[test]
fn repeated_viewport_is_a_no_op() {
    let mut engine = loaded(7, 0..7, info(false, 7, "0"));
    engine.on_resize(Viewport::new(WIDTH, 300)).unwrap();
    assert!(!engine.has_effects());
    assert!(!engine.has_pending_relayout());
}

#[test]
fn height_only_resize_keeps_layout() {
    let mut engine = loaded(7, 0..7, info(false, 7, "0"));
    let keys = engine.keys().to_vec();
    engine.on_resize(Viewport::new(WIDTH, 500)).unwrap();
    assert!(!engine.has_pending_relayout());
    assert_eq!(engine.keys(), keys.as_slice());
    assert_eq!(engine.viewport().height, 500);
}

#[test]
fn resize_reanchors_on_partly_hidden_first_item() {
    let mut engine = ScrollEngine::new(
        EngineConfig {
            max_items_per_row: Some(2),
            media_queries: vec![MediaQuery {
                max_width: 600,
                items_per_row: 1,
            }],
            ..config(10)
        },
        Viewport::new(WIDTH, 300),
    );
    engine.mount();
    let request = take_query(&mut engine);
    engine
        .complete(request.id, Ok(Some(page(0..20, info(false, 20, "0")))))
        .unwrap();
    engine.take_effects();
    mount_all(&mut engine, 0..10);
    engine.commit(&column(0..10, 0)).unwrap();

    // One row scrolled past, item 1 half hidden
    engine.on_scroll(90, &column(0..20, -90)).unwrap();
    assert_eq!(engine.render_start(), 1);
    assert_eq!(engine.min_height(), 60);
    engine.item_unmounted(&0);
    mount_all(&mut engine, [10]);
    engine.commit(&column(0..20, -90)).unwrap();
    assert_eq!(engine.first_visible().map(|a| a.index), Some(1));
    engine.take_effects();

    engine.on_resize(Viewport::new(1000, 300)).unwrap();
    assert_eq!(engine.items_per_row(), 2);
    assert_eq!(engine.render_start(), 0);

    // Two columns of 40px rows, still scrolled to 90
    let grid: HashMap<u32, ItemRect> = (0..20)
        .map(|id| {
            let row = i64::from(id / 2);
            (id, ItemRect::new(row * 40 - 90, 40, 500))
        })
        .collect();
    mount_all(&mut engine, 0..20);
    engine.commit(&grid).unwrap();

    // Item 1 is in the first row and stays half hidden: 30 * 40 / 60
    assert_eq!(scroll_targets(&engine.take_effects()), vec![20]);
    assert!(!engine.has_pending_relayout());
}

// ===== Cycling =====

#[test]
fn scrolling_down_recycles_rows_behind_viewport() {
    let mut engine = loaded(10, 0..20, info(false, 20, "0"));
    mount_all(&mut engine, 0..10);
    engine.commit(&column(0..10, 0)).unwrap();
    let keys = engine.keys().to_vec();

    engine.on_scroll(300, &column(0..20, -300)).unwrap();

    assert_eq!(engine.render_start(), 5);
    assert_eq!(engine.min_height(), 300);
    assert_eq!(engine.translate_y(), 0);
    assert_eq!(engine.direction(), ScrollDirection::Down);
    // Item 5 keeps its key in its new slot
    assert_eq!(engine.keys()[0], keys[5]);
    assert_eq!(engine.first_visible().map(|a| a.index), Some(5));
}

#[test]
fn cycle_waits_for_unregistered_items() {
    let mut engine = loaded(10, 0..20, info(false, 20, "0"));
    // Nothing mounted yet
    engine.on_scroll(300, &column(0..20, -300)).unwrap();
    assert_eq!(engine.render_start(), 0);
}

#[test]
fn scrolling_up_places_revealed_rows_above_window() {
    let mut engine = loaded(10, 0..20, info(false, 20, "0"));
    mount_all(&mut engine, 0..10);
    engine.commit(&column(0..10, 0)).unwrap();
    engine.on_scroll(300, &column(0..20, -300)).unwrap();
    for id in 0..5 {
        engine.item_unmounted(&id);
    }
    mount_all(&mut engine, 10..15);
    engine.commit(&column(0..20, -300)).unwrap();
    engine.take_effects();

    engine.on_scroll(270, &column(0..20, -270)).unwrap();
    assert_eq!(engine.render_start(), 0);
    assert!(engine.has_pending_relayout());

    let description = engine.render();
    assert_eq!(
        description.items[0].style.placement,
        Placement::Overlay { row: 1, column: 1 }
    );
    assert_eq!(
        description.items[5].style.placement,
        Placement::Grid { row: 1, column: 1 }
    );
    drop(description);

    mount_all(&mut engine, 0..5);
    engine.commit(&column(0..20, -270)).unwrap();

    // Back at the head the geometry collapses without moving anything
    assert!(!engine.has_pending_relayout());
    assert_eq!(engine.min_height(), 0);
    assert_eq!(engine.translate_y(), 0);
    assert!(scroll_targets(&engine.take_effects()).is_empty());
}

#[test]
fn rows_revealed_above_list_head_push_scroll_down() {
    let mut engine = loaded(10, 10..30, with_new(3));
    engine.load_new();
    let request = take_query(&mut engine);
    engine
        .complete(request.id, Ok(Some(page(7..10, info(false, 3, "7")))))
        .unwrap();
    engine.take_effects();
    assert_eq!(engine.render_start(), 3);

    // Window still drawn at the top; the load left the direction Up
    mount_all(&mut engine, 10..20);
    engine.commit(&column(10..20, 0)).unwrap();
    assert_eq!(engine.render_start(), 0);
    engine.take_effects();

    // The three new items are drawn above the first old one
    mount_all(&mut engine, 7..10);
    engine.commit(&column(7..20, -180)).unwrap();

    assert_eq!(scroll_targets(&engine.take_effects()), vec![180]);
    assert_eq!(engine.min_height(), 0);
    assert_eq!(engine.translate_y(), 0);
    assert_eq!(engine.scroll_y(), 180);

    // The echo of our own scroll is not a user scroll
    engine.on_scroll(180, &column(7..20, -180)).unwrap();
    assert_eq!(engine.direction(), ScrollDirection::Up);
    assert_eq!(engine.render_start(), 0);
    assert_eq!(engine.first_visible().map(|a| a.index), Some(3));
}

// ===== Jobs =====

#[test]
fn jobs_run_in_order_with_one_request_in_flight() {
    let mut engine = engine(7);
    let load = engine.mount();
    let more = engine.load_more();
    let request = take_query(&mut engine);
    assert_eq!(engine.snapshot().queued, 1);

    engine
        .complete(request.id, Ok(Some(page(0..7, info(true, 7, "0")))))
        .unwrap();
    let effects = engine.take_effects();
    assert_eq!(finished(&effects), vec![(load, JobOutcome::Completed)]);
    let queries: Vec<_> = effects
        .iter()
        .filter(|e| matches!(e, Effect::Query(_)))
        .collect();
    assert_eq!(queries.len(), 1);
    assert_eq!(engine.snapshot().in_flight, Some("load_more"));
    assert_ne!(load, more);
}

#[test]
fn job_without_anchor_runs_as_page_load() {
    let mut engine = engine(7);
    engine.load_more();
    let request = take_query(&mut engine);
    assert_eq!(request.query_type, QueryType::PageLoad);
    assert_eq!(request.args.offset, 0);
}

#[test]
fn remove_waits_for_earlier_jobs() {
    let mut engine = engine(7);
    let load = engine.mount();
    let request = take_query(&mut engine);
    let remove = engine.remove_item(3);
    assert!(engine.items().is_empty());

    engine
        .complete(request.id, Ok(Some(page(0..7, info(false, 7, "0")))))
        .unwrap();
    let effects = engine.take_effects();
    assert_eq!(
        finished(&effects),
        vec![
            (load, JobOutcome::Completed),
            (remove, JobOutcome::Completed)
        ]
    );
    assert_eq!(engine.items().len(), 6);
    assert_eq!(engine.more_offset(), 6);
}

#[test]
fn failed_query_leaves_items_untouched() {
    let mut engine = loaded(7, 0..7, info(true, 7, "0"));
    let job = engine.load_more();
    let request = take_query(&mut engine);
    engine
        .complete(
            request.id,
            Err(GatewayError::Transport("offline".to_string())),
        )
        .unwrap();

    let effects = engine.take_effects();
    assert_eq!(finished(&effects), vec![(job, JobOutcome::Failed)]);
    assert_eq!(engine.items().len(), 7);
    assert_eq!(engine.more_offset(), 7);
    assert_eq!(engine.snapshot().in_flight, None);
    assert!(!engine.render().refreshing_more);
}

#[test]
fn missing_page_counts_as_failure() {
    let mut engine = engine(7);
    let job = engine.mount();
    let request = take_query(&mut engine);
    engine.complete(request.id, Ok(None)).unwrap();
    assert_eq!(
        finished(&engine.take_effects()),
        vec![(job, JobOutcome::Failed)]
    );
    assert!(engine.items().is_empty());
}

#[test]
fn unknown_response_is_ignored() {
    let mut engine = loaded(7, 0..7, info(true, 7, "0"));
    let bogus = RequestId {
        generation: 9,
        seq: 99,
    };
    engine
        .complete(bogus, Ok(Some(page(100..107, info(true, 7, "100")))))
        .unwrap();
    assert!(!engine.has_effects());
    assert_eq!(engine.items()[0].id, 0);
}

#[test]
fn response_from_before_reset_is_stale() {
    let mut engine = engine(7);
    let first = engine.mount();
    let old = take_query(&mut engine);

    let reload = engine.set_page_size(5);
    engine
        .complete(old.id, Ok(Some(page(0..7, info(true, 7, "0")))))
        .unwrap();

    let effects = engine.take_effects();
    assert_eq!(finished(&effects), vec![(first, JobOutcome::Stale)]);
    assert!(engine.items().is_empty());

    // The reload goes out with the new page size
    let fresh: Vec<&PageRequest> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::Query(request) => Some(request),
            _ => None,
        })
        .collect();
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].args.limit, 5);
    assert_ne!(fresh[0].id, old.id);
    assert_eq!(engine.snapshot().in_flight, Some("page_load"));
    assert_ne!(first, reload);
}

#[test]
fn reset_marks_queued_jobs_stale() {
    let mut engine = loaded(7, 0..7, info(true, 7, "0"));
    engine.load_more();
    let in_flight = take_query(&mut engine);
    let queued = engine.load_new();

    engine.set_orderings(vec![crate::model::Ordering::new(
        "created_at",
        crate::model::SortDirection::Asc,
    )]);
    let effects = engine.take_effects();
    assert_eq!(finished(&effects), vec![(queued, JobOutcome::Stale)]);
    assert!(engine.items().is_empty());
    assert_eq!(engine.anchor(), None);

    engine
        .complete(in_flight.id, Ok(Some(page(7..14, info(true, 14, "0")))))
        .unwrap();
    let request = take_query(&mut engine);
    assert_eq!(request.query_type, QueryType::PageLoad);
    assert_eq!(request.args.orderings.len(), 1);
}

// ===== Refresh =====

#[test]
fn refresh_counts_then_fetches_exactly_the_new_items() {
    let mut engine = loaded(7, 10..17, info(true, 7, "10"));
    let job = engine.refresh();

    let count = take_query(&mut engine);
    assert_eq!(count.query_type, QueryType::LoadMore);
    assert_eq!((count.args.offset, count.args.limit), (0, 1));

    engine
        .complete(count.id, Ok(Some(page(10..11, with_new(2)))))
        .unwrap();
    let effects = engine.take_effects();
    assert!(finished(&effects).is_empty());
    let fetch = effects
        .into_iter()
        .find_map(|e| match e {
            Effect::Query(request) => Some(request),
            _ => None,
        })
        .unwrap();
    assert_eq!(fetch.query_type, QueryType::LoadNew);
    assert_eq!((fetch.args.offset, fetch.args.limit), (-2, 2));
    assert!(engine.render().refreshing_new);

    engine
        .complete(fetch.id, Ok(Some(page(8..10, info(false, 2, "8")))))
        .unwrap();
    assert_eq!(
        finished(&engine.take_effects()),
        vec![(job, JobOutcome::Completed)]
    );
    assert_eq!(engine.items()[0].id, 8);
    assert_eq!(engine.items().len(), 9);
}

#[test]
fn refresh_without_new_items_completes_after_count() {
    let mut engine = loaded(7, 10..17, info(true, 7, "10"));
    let job = engine.refresh();
    let count = take_query(&mut engine);
    engine
        .complete(count.id, Ok(Some(page(10..11, info(true, 1, "10")))))
        .unwrap();
    let effects = engine.take_effects();
    assert_eq!(finished(&effects), vec![(job, JobOutcome::Completed)]);
    assert!(!effects.iter().any(|e| matches!(e, Effect::Query(_))));
    assert_eq!(engine.items().len(), 7);
}

#[test]
fn manual_affordances_map_to_jobs() {
    let mut engine = loaded(7, 10..17, info(true, 7, "10"));
    engine.on_more();
    assert_eq!(engine.snapshot().in_flight, Some("load_more"));
    engine.on_new();
    assert_eq!(engine.snapshot().queued, 1);
}

// ===== Removal =====

#[test]
fn removing_rendered_item_keeps_keys_of_the_rest() {
    let mut engine = loaded(7, 0..7, info(false, 7, "0"));
    let keys = engine.keys().to_vec();
    let job = engine.remove_item(3);

    assert_eq!(
        finished(&engine.take_effects()),
        vec![(job, JobOutcome::Completed)]
    );
    assert_eq!(engine.items().len(), 6);
    assert_eq!(engine.items()[3].id, 4);
    assert_eq!(engine.keys()[3], keys[4]);
    assert_eq!(engine.keys().len(), 7);
}

#[test]
fn removing_unknown_item_still_completes() {
    let mut engine = loaded(7, 0..7, info(false, 7, "0"));
    let job = engine.remove_item(99);
    assert_eq!(
        finished(&engine.take_effects()),
        vec![(job, JobOutcome::Completed)]
    );
    assert_eq!(engine.items().len(), 7);
    assert_eq!(engine.more_offset(), 7);
}

#[test]
fn removing_item_before_window_shifts_window_back() {
    let mut engine = loaded(7, 10..17, with_new(3));
    engine.load_new();
    let request = take_query(&mut engine);
    engine
        .complete(request.id, Ok(Some(page(7..10, info(false, 3, "7")))))
        .unwrap();
    assert_eq!(engine.render_start(), 3);

    engine.remove_item(7);
    assert_eq!(engine.render_start(), 2);
    assert_eq!(engine.rendered_items()[0].id, 10);
}

#[test]
fn removing_row_above_view_scrolls_up_by_its_height() {
    let mut engine = loaded(10, 0..10, info(false, 10, "0"));
    mount_all(&mut engine, 0..10);
    engine.commit(&column(0..10, 0)).unwrap();
    engine.on_scroll(90, &column(0..10, -90)).unwrap();
    assert_eq!(engine.first_visible().map(|a| a.index), Some(1));
    engine.take_effects();

    engine.remove_item(0);
    engine.commit(&column(1..10, -90)).unwrap();

    assert_eq!(scroll_targets(&engine.take_effects()), vec![30]);
    assert_eq!(engine.first_visible().map(|a| a.index), Some(0));
}

// ===== Pull to refresh =====

#[test]
fn pull_past_threshold_queues_refresh() {
    let mut engine = loaded(7, 10..17, info(true, 7, "10"));
    engine.pull_start(100);
    engine.pull_move(190);
    assert_eq!(engine.render().pull_distance, 90);

    assert!(engine.pull_end().is_some());
    assert_eq!(engine.render().pull_distance, 0);
    assert_eq!(engine.snapshot().in_flight, Some("refresh"));
}

#[test]
fn short_pull_does_nothing() {
    let mut engine = loaded(7, 10..17, info(true, 7, "10"));
    engine.pull_start(100);
    engine.pull_move(130);
    assert_eq!(engine.pull_end(), None);
    assert_eq!(engine.snapshot().in_flight, None);
}

#[test]
fn pull_only_starts_at_top() {
    let mut engine = loaded(7, 10..17, info(true, 7, "10"));
    engine.on_scroll(50, &HashMap::<u32, ItemRect>::new()).unwrap();
    engine.pull_start(100);
    engine.pull_move(300);
    assert_eq!(engine.pull_end(), None);
}

// ===== URL state =====

#[test]
fn url_params_follow_window_state() {
    let mut engine = loaded(10, 0..20, info(false, 20, "0"));
    assert_eq!(
        engine.url_params(),
        Some(UrlParams {
            offset: 0,
            offset_relative_to: "0".to_string(),
            min_height: 0,
            translate_y: 0,
        })
    );

    mount_all(&mut engine, 0..10);
    engine.commit(&column(0..10, 0)).unwrap();
    let effects = engine.take_effects();
    assert!(effects
        .iter()
        .any(|e| matches!(e, Effect::ReplaceUrl(p) if p.offset == 0)));

    // Throttled until flushed after the interval
    engine.on_scroll(300, &column(0..20, -300)).unwrap();
    assert!(!engine
        .take_effects()
        .iter()
        .any(|e| matches!(e, Effect::ReplaceUrl(_))));

    engine.flush_url(engine.clock() + std::time::Duration::from_secs(1));
    let effects = engine.take_effects();
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::ReplaceUrl(p) if p.offset == 5 && p.min_height == 300
    )));
}

#[test]
fn resumed_page_load_restores_geometry() {
    let params = UrlParams {
        offset: 40,
        offset_relative_to: "abc".to_string(),
        min_height: 2400,
        translate_y: -120,
    };
    let mut engine = engine(7).resume_from(params);
    engine.mount();
    let request = take_query(&mut engine);
    assert_eq!(request.query_type, QueryType::PageLoad);
    assert_eq!(request.args.offset, 40);
    assert_eq!(request.args.offset_relative_to.as_deref(), Some("abc"));

    engine
        .complete(request.id, Ok(Some(page(40..47, info(true, 7, "40")))))
        .unwrap();
    assert_eq!(engine.min_height(), 2400);
    assert_eq!(engine.translate_y(), -120);
    assert!(engine.loaded_with_query_params());
    assert_eq!(engine.anchor(), Some("40"));
}

#[test]
fn effect_serializes_with_tag() {
    let json = serde_json::to_string(&Effect::ScrollTo { y: 12 }).unwrap();
    assert_eq!(json, r#"{"effect":"scroll_to","y":12}"#);
}

// ===== Automatic loads =====

#[test]
fn tail_on_screen_loads_more() {
    let mut engine = loaded(3, 0..3, info(true, 3, "0"));
    mount_all(&mut engine, 0..3);
    engine.commit(&column(0..3, 0)).unwrap();
    let request = take_query(&mut engine);
    assert_eq!(request.query_type, QueryType::LoadMore);
    assert_eq!(request.args.offset, 3);
}

#[test]
fn failed_load_pauses_automatic_loads_until_user_scrolls() {
    let mut engine = loaded(3, 0..3, info(true, 3, "0"));
    mount_all(&mut engine, 0..3);
    engine.commit(&column(0..3, 0)).unwrap();
    let request = take_query(&mut engine);
    engine
        .complete(request.id, Err(GatewayError::Transport("down".to_string())))
        .unwrap();
    engine.commit(&column(0..3, 0)).unwrap();
    assert_eq!(engine.snapshot().in_flight, None);

    engine.on_scroll(1, &column(0..3, -1)).unwrap();
    assert_eq!(engine.snapshot().in_flight, Some("load_more"));
}

#[test]
fn head_on_screen_loads_new_only_after_resume() {
    let params = UrlParams {
        offset: 10,
        offset_relative_to: "0".to_string(),
        min_height: 0,
        translate_y: 0,
    };
    let mut engine = engine(3).resume_from(params);
    engine.mount();
    let request = take_query(&mut engine);
    engine
        .complete(request.id, Ok(Some(page(10..13, with_new(10)))))
        .unwrap();
    engine.take_effects();

    mount_all(&mut engine, 10..13);
    engine.commit(&column(10..13, 0)).unwrap();
    let queries: Vec<QueryType> = engine
        .take_effects()
        .into_iter()
        .filter_map(|e| match e {
            Effect::Query(request) => Some(request.query_type),
            _ => None,
        })
        .collect();
    // The tail is on screen too, so more is loaded first
    assert_eq!(queries, vec![QueryType::LoadMore]);
    assert_eq!(engine.snapshot().queued, 1);
}
