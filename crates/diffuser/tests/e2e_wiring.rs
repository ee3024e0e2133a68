//! End-to-end behavior of a wired graph: fusers aggregating events at one
//! edge, diffusers terminating updates at the other, connected through
//! `connect` + `into_effect`.

use diffuser::{Diffuser, Effect, Fuser};
use diffuser_harness::{FanoutSource, Recorder, StickySource};

#[test]
fn stream_feeds_a_change_gated_sink() {
    let source = FanoutSource::new();
    let recorder = Recorder::new();

    let stream = Fuser::extract(|raw: &i32| raw / 10, Fuser::from(source.clone()));
    let sink = Diffuser::into(recorder.effect());
    let connection = stream.connect(sink.into_effect());

    source.emit(&10); // extract -> 1, first delivery fires
    source.emit(&11); // extract -> 1, gated
    source.emit(&19); // extract -> 1, gated
    source.emit(&20); // extract -> 2, fires
    connection.dispose();
    source.emit(&30); // disposed, never reaches the sink

    assert_eq!(recorder.values(), vec![1, 2]);
}

#[test]
fn disposal_cuts_off_a_sticky_source_before_the_sink() {
    let source = StickySource::new();
    let recorder = Recorder::new();

    let connection = Fuser::from(source.clone()).connect(
        Diffuser::into(recorder.effect()).into_effect(),
    );
    source.emit(&1);
    connection.dispose();
    source.emit(&2);

    assert_eq!(recorder.values(), vec![1]);
}

#[test]
fn stacked_policies_gate_in_sequence() {
    let recorder = Recorder::new();

    // Outer policy: only react when the value grows. Inner policy: plain
    // change gating. The outer wraps the inner via `into_effect`.
    let inner = Diffuser::into(recorder.effect());
    let stacked = Diffuser::into_when(
        |previous: &i32, next: &i32| next > previous,
        inner.into_effect(),
    );

    stacked.run(&5); // first call, both fire
    stacked.run(&3); // not growing: outer gates it out
    stacked.run(&4); // growing relative to 3: outer passes, inner sees 5 -> 4
    stacked.run(&4); // not growing
    assert_eq!(recorder.values(), vec![5, 4]);
}

#[test]
fn one_stream_fans_out_into_many_sinks() {
    let source = FanoutSource::new();
    let stream = Fuser::from(source.clone());

    let gated = Recorder::new();
    let every = Recorder::new();
    let merged = Diffuser::into_all(vec![
        Diffuser::into(gated.effect()),
        Diffuser::into_always(every.effect()),
    ]);
    let connection = stream.connect(merged.into_effect());

    source.emit(&7);
    source.emit(&7);
    source.emit(&8);
    connection.dispose();

    assert_eq!(gated.values(), vec![7, 8]);
    assert_eq!(every.values(), vec![7, 7, 8]);
}

#[test]
fn constant_extraction_counts_events_not_values() {
    let source = FanoutSource::new();
    let recorder = Recorder::new();

    // Every click-like event becomes a unit value; the once-sink reacts to
    // the first event only.
    let clicks = Fuser::extract_constant((), Fuser::from(source.clone()));
    let connection = clicks.connect(Diffuser::into_once(recorder.effect()).into_effect());

    source.emit(&1);
    source.emit(&2);
    source.emit(&3);
    connection.dispose();

    assert_eq!(recorder.len(), 1);
}

#[test]
fn failure_in_the_sink_preserves_the_stale_cache() {
    let recorder = Recorder::new();
    let sink = {
        let effect = recorder.effect();
        move |value: &i32| {
            assert!(*value != 7, "sink rejected 7");
            effect.run(value);
        }
    };
    let diffuser = Diffuser::into(sink);

    diffuser.run(&5);
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        diffuser.run(&7);
    }));
    assert!(outcome.is_err());

    // The failed value was not recorded: 5 is still the cache, so this is
    // gated out rather than treated as a change.
    diffuser.run(&5);
    assert_eq!(recorder.values(), vec![5]);
}
