use gridbench_exp::{InvalidReason, Invocation, InvocationOutcome, SampleExtractor, TrialResult};

fn extractor() -> SampleExtractor {
    SampleExtractor::new(0, 1)
}

#[test]
fn nonzero_exit_is_invalid_regardless_of_output() {
    for code in [1, 2, 127, -1] {
        let invocation = Invocation::exited(code, "ok 123456\n");
        assert_eq!(
            extractor().extract(&invocation),
            TrialResult::Invalid(InvalidReason::NonZeroExit(Some(code)))
        );
    }
}

#[test]
fn clean_exit_yields_designated_token() {
    let invocation = Invocation::exited(0, "ok 123456\n");
    assert_eq!(extractor().extract(&invocation), TrialResult::Valid(123456.0));
}

#[test]
fn workload_time_line_is_parsed() {
    let stdout = "Time: 48211337 ns\nFetch: 1200 ns average, 0/500 failed, 10 messages\n";
    let result = extractor().extract(&Invocation::exited(0, stdout));
    assert_eq!(result.sample(), Some(48_211_337.0));

    let fetch = SampleExtractor::new(1, 1).extract(&Invocation::exited(0, stdout));
    assert_eq!(fetch.sample(), Some(1200.0));
}

#[test]
fn unparseable_output_is_invalid() {
    let cases = [
        ("", InvalidReason::MissingLine),
        ("ok\n", InvalidReason::MissingToken),
        ("ok abc\n", InvalidReason::Unparseable("abc".into())),
        ("ok NaN\n", InvalidReason::Unparseable("NaN".into())),
        ("ok inf\n", InvalidReason::Unparseable("inf".into())),
    ];
    for (stdout, reason) in cases {
        let result = extractor().extract(&Invocation::exited(0, stdout));
        assert_eq!(result, TrialResult::Invalid(reason), "stdout {stdout:?}");
        assert!(!result.is_valid());
    }
}

#[test]
fn failed_launches_are_invalid() {
    let timed_out = Invocation {
        stdout: "ok 5\n".into(),
        stderr: String::new(),
        outcome: InvocationOutcome::TimedOut,
    };
    assert_eq!(
        extractor().extract(&timed_out),
        TrialResult::Invalid(InvalidReason::TimedOut)
    );

    let signaled = Invocation {
        outcome: InvocationOutcome::Signaled,
        ..timed_out.clone()
    };
    assert_eq!(
        extractor().extract(&signaled),
        TrialResult::Invalid(InvalidReason::NonZeroExit(None))
    );

    let io = Invocation {
        outcome: InvocationOutcome::IoError("No such file".into()),
        ..timed_out
    };
    assert_eq!(
        extractor().extract(&io),
        TrialResult::Invalid(InvalidReason::Io("No such file".into()))
    );
}

#[test]
fn samples_are_not_rescaled() {
    let result = extractor().extract(&Invocation::exited(0, "x 4000000.5"));
    assert_eq!(result.sample(), Some(4_000_000.5));
}
