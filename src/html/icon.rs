use scraper::Html;

use super::selector;

/// Which SIM slot the status page marks as active: `1`, `2`, or `0` if none.
///
/// The page has no text for this, only an icon like `<i class="icon icon-sim1">`.
pub fn sim_slot(html: &str) -> u8 {
    let document = Html::parse_document(html);
    let Some(icon) = document.select(&selector("i.icon[class*='sim']")).next() else {
        return 0;
    };

    match icon.value().classes().find(|class| class.contains("sim")) {
        Some(class) if class.contains("sim1") => 1,
        Some(class) if class.contains("sim2") => 2,
        _ => 0,
    }
}
