use chrono::{DateTime, NaiveDate};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::error::Error;
use std::io::Write;

use crate::posts::Post;
use crate::text::sanitize_text;

// Cap text elements to avoid enormous feed entries (truncate with ellipsis)
const MAX_TEXT_LEN: usize = 4096;

const DATE_FORMATS: [&str; 6] = [
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

fn write_text_element<W: Write>(
    w: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), Box<dyn Error>> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    let mut s = sanitize_text(text);
    if s.len() > MAX_TEXT_LEN {
        let mut cut = MAX_TEXT_LEN;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push_str("… (truncated)");
    }
    w.write_event(Event::Text(BytesText::new(&s)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// RFC 2822 pubDate for a scraped display date ("21 Aug 2025",
/// "August 21, 2025", RFC 3339). Unparseable input is passed through.
pub fn format_pub_date(raw: &str) -> String {
    let cleaned = raw.replace('.', "");
    let cleaned = cleaned.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(cleaned, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return dt.and_utc().to_rfc2822();
            }
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return dt.to_rfc2822();
    }
    raw.to_string()
}

/// Write the posts as an RSS 2.0 channel.
pub fn write_rss<W: Write>(
    out: W,
    channel_link: &str,
    posts: &[Post],
) -> Result<(), Box<dyn Error>> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss_start = BytesStart::new("rss");
    rss_start.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(rss_start))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;
    write_text_element(&mut writer, "title", "Voxitec - Recent News")?;
    write_text_element(&mut writer, "link", channel_link)?;
    write_text_element(&mut writer, "description", "Latest posts from the Voxitec blog")?;

    for post in posts {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        write_text_element(&mut writer, "title", &post.title)?;
        write_text_element(&mut writer, "link", &post.url)?;
        write_text_element(&mut writer, "guid", &post.url)?;
        if let Some(date) = &post.date {
            write_text_element(&mut writer, "pubDate", &format_pub_date(date))?;
        }
        let mut enc = BytesStart::new("enclosure");
        enc.push_attribute(("url", post.image_url.as_str()));
        writer.write_event(Event::Empty(enc))?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut out = writer.into_inner();
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// Write the posts as a pretty-printed JSON array.
pub fn write_json<W: Write>(mut out: W, posts: &[Post]) -> Result<(), Box<dyn Error>> {
    serde_json::to_writer_pretty(&mut out, posts)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
