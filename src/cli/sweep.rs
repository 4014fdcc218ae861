use chrono::Utc;

use crate::model::Source;
use crate::store::ListingStore;

pub fn sweep(store: &ListingStore, selector: &str, window_days: i64) -> anyhow::Result<()> {
    let now = Utc::now();
    let mut total = 0u64;

    for source in Source::parse_selector(selector)? {
        let deactivated = store.sweep(source, window_days, now)?;
        println!(
            "{}: deactivated {} listing(s) not seen in {} days",
            source.display_name(),
            deactivated,
            window_days
        );
        total += deactivated;
    }

    println!("Total deactivated: {total}");
    Ok(())
}
