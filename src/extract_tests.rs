#[cfg(test)]
mod extraction_rule_tests {
    use crate::extract;

    struct CoverageCase {
        input: &'static str,
        expected: Option<f64>,
        description: &'static str,
    }

    const COVERAGE_CASES: &[CoverageCase] = &[
        CoverageCase { input: "Test coverage: 85.5%", expected: Some(85.5), description: "labelled with colon" },
        CoverageCase { input: "coverage 72%", expected: Some(72.0), description: "bare keyword, no colon" },
        CoverageCase { input: "TEST COVERAGE:90%", expected: Some(90.0), description: "upper case, no space" },
        CoverageCase { input: "coverage unknown", expected: None, description: "no percentage" },
        CoverageCase { input: "", expected: None, description: "empty blob" },
    ];

    #[test]
    fn test_coverage_cases() {
        for case in COVERAGE_CASES {
            assert_eq!(extract::test_coverage(Some(case.input)), case.expected, "{}", case.description);
        }
    }

    #[test]
    fn absent_blob_short_circuits_every_rule() {
        assert_eq!(extract::build_success(None), None);
        assert_eq!(extract::build_duration(None), None);
        assert_eq!(extract::error_tokens(None), None);
        assert_eq!(extract::quality_gate_passed(None), None);
        assert_eq!(extract::fatal(Some("   ")), None);
        assert_eq!(extract::error_lines(None), None);
        assert_eq!(extract::failure_tokens(None), 0);
    }

    #[test]
    fn numeric_rules_distinguish_absent_from_zero() {
        assert_eq!(extract::sonar_bugs(Some("Bugs: 0")), Some(0));
        assert_eq!(extract::sonar_bugs(Some("no issues reported")), None);
        assert_eq!(extract::error_tokens(Some("all clean")), None);
    }

    #[test]
    fn build_duration_prefers_build_time_over_total_time() {
        let s = "Total time: 9m 0s\nBuild time: 1m 30s";
        assert_eq!(extract::build_duration(Some(s)).as_deref(), Some("1m 30s"));
        assert_eq!(extract::build_duration(Some("Total time: 45s")).as_deref(), Some("45s"));
    }

    #[test]
    fn quality_gate_is_negated_failure_phrase() {
        assert_eq!(extract::quality_gate_passed(Some("Quality Gate FAILED on new code")), Some(false));
        assert_eq!(extract::quality_gate_passed(Some("quality gate passed")), Some(true));
    }

    #[test]
    fn error_tokens_are_case_sensitive() {
        assert_eq!(extract::error_tokens(Some("ERROR: a\nerror: b\nERROR: c")), Some(2));
    }

    #[test]
    fn error_lines_collect_text_after_marker() {
        let s = "fetching origin\nERROR: remote rejected\nFATAL: aborting\nERROR: lock exists  ";
        let lines = extract::error_lines(Some(s)).expect("two error lines");
        assert_eq!(lines, vec!["remote rejected".to_string(), "lock exists".to_string()]);
    }

    #[test]
    fn error_lines_ignore_mid_line_markers() {
        let s = "step 3 ERROR: not at line start\r\nERROR: real failure\r\n";
        assert_eq!(extract::error_lines(Some(s)), Some(vec!["real failure".to_string()]));
        assert_eq!(extract::error_lines(Some("retry ERROR: once")), None);
    }

    #[test]
    fn sonar_and_debt_rules() {
        let s = "Bugs: 3, Vulnerabilities: 1, Code smells: 42. Technical debt: 2.5 hours. Duplicated lines: 4.2%";
        assert_eq!(extract::sonar_bugs(Some(s)), Some(3));
        assert_eq!(extract::sonar_vulnerabilities(Some(s)), Some(1));
        assert_eq!(extract::sonar_code_smells(Some(s)), Some(42));
        assert_eq!(extract::technical_debt_hours(Some(s)), Some(2.5));
        assert_eq!(extract::duplicated_lines(Some(s)), Some(4.2));
    }

    #[test]
    fn rules_carry_their_names() {
        assert_eq!(extract::BUILD_SUCCESS.name, "build_success");
        assert!(extract::ROLLBACK.regex().is_match("ROLLBACK INITIATED by operator"));
    }
}
