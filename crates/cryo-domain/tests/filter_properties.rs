use cryo_domain::{EntityFilter, MatchKind, MixtureFilter, MoleculeFilter};
use proptest::prelude::*;

fn text() -> impl Strategy<Value = Option<String>> {
  prop_oneof![Just(None), Just(Some(String::new())), "[a-zA-Z0-9 -]{1,12}".prop_map(Some)]
}

proptest! {
  #[test]
  fn live_filters_drop_absent_and_empty(name in text(), formula in text(), source in text(),
                                        inchikey in text(), is_verified in proptest::option::of(any::<bool>())) {
    let f = MoleculeFilter { name: name.clone(), formula: formula.clone(), inchikey: inchikey.clone(),
                             source: source.clone(), is_verified };
    let live = f.live_filters();
    let expected = [&name, &formula, &inchikey, &source].iter()
                                                       .filter(|v| v.as_deref().map_or(false, |s| !s.is_empty()))
                                                       .count()
                   + usize::from(is_verified.is_some());
    prop_assert_eq!(live.len(), expected);
    for flt in &live {
      prop_assert_ne!(&flt.value, &serde_json::json!(""));
    }
    // función pura: mismo filtro, mismos filtros vivos
    prop_assert_eq!(live, f.clone().live_filters());
  }

  #[test]
  fn only_free_text_columns_use_substring(name in text(), description in text(), created_by in text()) {
    let f = MixtureFilter { name, description, is_public: None, created_by };
    for flt in f.live_filters() {
      let free_text = flt.column == "name" || flt.column == "description";
      prop_assert_eq!(flt.kind == MatchKind::Substring, free_text);
    }
  }
}
