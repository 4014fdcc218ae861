use comfy_table::{Cell, Table};

use crate::error::AppError;
use crate::store::ListingStore;
use crate::store::models::ListingFilter;

pub fn list(store: &ListingStore, filter: &ListingFilter) -> anyhow::Result<()> {
    let listings = store.query(filter)?;

    if listings.is_empty() {
        println!("No listings found. Run `mietradar run --query <term>` to aggregate some.");
        return Ok(());
    }

    let total = store.count(&ListingFilter {
        limit: None,
        offset: None,
        ..filter.clone()
    })?;

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Source", "Title", "Price", "Rooms", "Location", "Active", "Last Seen",
    ]);

    for l in &listings {
        table.add_row(vec![
            Cell::new(&l.listing.id),
            Cell::new(l.listing.source.as_str()),
            Cell::new(&l.listing.title),
            Cell::new(
                l.listing
                    .price
                    .map(|p| format!("{p:.0} {}", l.listing.currency))
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(
                l.listing
                    .rooms
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(&l.listing.location),
            Cell::new(if l.is_active { "yes" } else { "no" }),
            Cell::new(&l.last_seen),
        ]);
    }

    println!("{table}");
    println!("Showing {} of {} listing(s)", listings.len(), total);
    Ok(())
}

pub fn info(store: &ListingStore, id: &str) -> anyhow::Result<()> {
    let Some(l) = store.get(id)? else {
        return Err(AppError::ListingNotFound(id.to_string()).into());
    };

    println!("ID:            {}", l.listing.id);
    println!("Source:        {}", l.listing.source.display_name());
    if !l.listing.source_id.is_empty() {
        println!("Source ID:     {}", l.listing.source_id);
    }
    println!("Title:         {}", l.listing.title);
    if let Some(p) = l.listing.price {
        println!("Price:         {:.2} {}", p, l.listing.currency);
    }
    if !l.listing.location.is_empty() {
        println!("Location:      {}", l.listing.location);
    }
    if !l.listing.detailed_location.is_empty() {
        println!("District:      {}", l.listing.detailed_location);
    }
    if let (Some(lat), Some(lng)) = (l.listing.coordinates.lat, l.listing.coordinates.lng) {
        println!("Coordinates:   {lat}, {lng}");
    }
    if let Some(s) = l.listing.size_sqm {
        println!("Size:          {s} m²");
    }
    if let Some(r) = l.listing.rooms {
        println!("Rooms:         {r}");
    }
    println!("Type:          {}", l.listing.property_type.as_str());
    if !l.listing.url.is_empty() {
        println!("URL:           {}", l.listing.url);
    }
    if !l.listing.images.is_empty() {
        println!("Images:        {}", l.listing.images.len());
    }
    if !l.listing.description.is_empty() {
        println!("Description:   {}", l.listing.description);
    }
    if !l.listing.full_description.is_empty() {
        println!("Full text:     {}", l.listing.full_description);
    }
    println!("Active:        {}", if l.is_active { "yes" } else { "no" });
    println!("First seen:    {}", l.first_seen);
    println!("Last seen:     {}", l.last_seen);
    println!("Scraped at:    {}", l.scraped_at);
    match (&l.enriched_at, l.enrichment_failed) {
        (Some(at), _) => println!("Enriched:      {at}"),
        (None, true) => println!("Enriched:      failed"),
        (None, false) => println!("Enriched:      no"),
    }
    if !l.listing.source_data.is_empty() {
        println!(
            "Source data:   {}",
            serde_json::to_string_pretty(&l.listing.source_data)?
        );
    }

    Ok(())
}
