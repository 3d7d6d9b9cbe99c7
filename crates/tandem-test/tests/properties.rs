//! Property tests over the full stack.

use proptest::prelude::*;
use tandem_record::{Gettable, Savable};
use tandem_sql::Value;
use tandem_test::Harness;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever the database returns from a save is what a later get sees.
    #[test]
    fn prop_hybrid_save_get_converges(id in 1i64..10_000, name in "[a-zA-Z ]{0,24}", age in proptest::option::of(0i64..130)) {
        let h = Harness::new();
        let store = h.hybrid();

        let mut entity = store.new_entity().with("name", name.as_str()).unwrap();
        entity.set("age", age).unwrap();
        h.driver.push_row([
            ("id", Value::Int(id)),
            ("name", Value::from(name.as_str())),
            ("age", Value::from(age)),
        ]);
        store.save(&mut entity).unwrap();

        let fetched = store.get(&Value::Int(id)).unwrap();
        prop_assert_eq!(fetched, entity);
        prop_assert_eq!(h.journal.statements().len(), 1);
    }

    /// Every executed statement carries one parameter per placeholder.
    #[test]
    fn prop_executed_placeholders_match_params(ages in proptest::collection::vec(0i64..130, 1..6)) {
        let h = Harness::new();
        let users = tandem_test::users();
        let query = users
            .select()
            .where_(users.column("age").unwrap().in_(ages.clone()).unwrap())
            .unwrap()
            .limit(10)
            .unwrap();

        tandem_pool::Execute::all(&query, &h.pool).unwrap();
        let events = h.journal.events();
        let sql = events[0].sql().unwrap();
        prop_assert_eq!(sql.matches('?').count(), events[0].params().unwrap().len());
        prop_assert_eq!(events[0].params().unwrap().len(), ages.len() + 1);
    }
}
