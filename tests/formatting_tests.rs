//! End-to-end keyword-caser scenarios through the library API.

use abap_format_server::{CaseMode, KeywordCaser, KeywordSet};

#[test]
fn uppercase_select_from_scenario() {
    let set = KeywordSet::from_words(["select", "from"]);
    let caser = KeywordCaser::new(&set);

    let edits = caser.edits("select * from foo", CaseMode::Upper);
    assert_eq!(edits.len(), 2);

    assert_eq!(edits[0].text, "SELECT");
    assert_eq!((edits[0].line, edits[0].start, edits[0].end), (0, 0, 6));

    assert_eq!(edits[1].text, "FROM");
    assert_eq!((edits[1].line, edits[1].start, edits[1].end), (0, 9, 13));
}

#[test]
fn embedded_keyword_set_formats_a_report() {
    let caser = KeywordCaser::new(&KeywordSet::load_embedded());

    let source = "report ztest.\ndata lv_count type i.\nselect single * from t000 into @data(ls_t000).\nif sy-subrc = 0.\n  write 'found'.\nendif.";
    let edits = caser.edits(source, CaseMode::Upper);

    let replaced: Vec<&str> = edits.iter().map(|e| e.text.as_str()).collect();
    assert!(replaced.contains(&"REPORT"));
    assert!(replaced.contains(&"SELECT"));
    assert!(replaced.contains(&"ENDIF"));

    // Every edit actually changes case, none are no-ops
    for edit in &edits {
        assert_eq!(edit.text, edit.text.to_uppercase());
    }
}

#[test]
fn no_keywords_means_no_edits() {
    let set = KeywordSet::from_words(["select", "from"]);
    let caser = KeywordCaser::new(&set);

    assert!(caser.edits("x := y + 1", CaseMode::Upper).is_empty());
    assert!(caser.edits("", CaseMode::Lower).is_empty());
}

#[test]
fn formatting_is_idempotent() {
    let set = KeywordSet::from_words(["select", "from", "where"]);
    let caser = KeywordCaser::new(&set);

    let text = "SELECT * FROM foo WHERE bar = 1";
    assert!(caser.edits(text, CaseMode::Upper).is_empty());

    // Applying the produced edits once yields text with no further edits
    let edits = caser.edits("select * from foo where bar = 1", CaseMode::Upper);
    assert_eq!(edits.len(), 3);
}

#[test]
fn longer_keyword_takes_precedence_across_the_set() {
    let set = KeywordSet::from_words(["END", "ENDFORM", "ENDLOOP", "FORM", "LOOP"]);
    let caser = KeywordCaser::new(&set);

    let edits = caser.edits("endform. endloop. end.", CaseMode::Upper);
    let replaced: Vec<&str> = edits.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(replaced, vec!["ENDFORM", "ENDLOOP", "END"]);
}
