//! Post and tag rendering.
//!
//! A render is a straight sequence of awaits: record, author, date, body,
//! footer, metadata. Only the record fetch is fatal; every other lookup
//! degrades to a placeholder and the render carries on.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::classify::is_url;
use crate::config::FeedConfig;
use crate::embed::{synthesize_embed, POST_CONTENT_CLASS, TAG_CONTENT_CLASS};
use crate::error::RenderError;
use crate::format::{chain_time_to_local, format_display_date, net_score, shorten_address, truncate_tag};
use crate::ledger::{BlockSource, EventFilter, Ledger, LedgerError, LedgerEvent, NameResolver, PostId, TagDirectory};
use crate::markup::{escape_attr, escape_text, Markup};
use crate::probe::ContentProbe;

pub const UNKNOWN_DATE_LABEL: &str = "Date unavailable";

const NO_TAGS: &str = r#"<span class="no-tags">No tags yet</span>"#;
const TAGS_UNAVAILABLE: &str = r#"<span class="tags-unavailable">Tags unavailable</span>"#;

const ACTION_FOOTER: &str = concat!(
    r#"<div class="post-actions">"#,
    r#"<button type="button" class="upvote-button">Upvote</button>"#,
    r#"<button type="button" class="downvote-button">Downvote</button>"#,
    r#"<button type="button" class="tag-button">Tag</button>"#,
    r#"<button type="button" class="reply-button">Reply</button>"#,
    r#"<div class="tag-panel" hidden>"#,
    r#"<input type="text" class="input-tag" placeholder="Tag name"/>"#,
    r#"<button type="button" class="submit-tag">Add tag</button>"#,
    r#"</div>"#,
    r#"<div class="reply-panel" hidden>"#,
    r#"<textarea class="input-reply" placeholder="Write a reply"></textarea>"#,
    r#"<button type="button" class="submit-reply">Send reply</button>"#,
    r#"</div>"#,
    r#"</div>"#,
);

/// A tag attached to a post, with its display payload resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub name: String,
    pub payload: Option<String>,
}

#[derive(Clone)]
pub struct Renderer {
    pub ledger: Arc<dyn Ledger>,
    pub blocks: Arc<dyn BlockSource>,
    pub names: Arc<dyn NameResolver>,
    /// Present for deployments whose tag events carry no payload.
    pub tag_directory: Option<Arc<dyn TagDirectory>>,
    pub probe: Arc<dyn ContentProbe>,
    pub config: FeedConfig,
}

impl Renderer {
    pub async fn render_post(&self, id: PostId) -> Result<Markup, RenderError> {
        let record = self
            .ledger
            .get_post(id)
            .await
            .map_err(|source| RenderError::PostUnavailable { id, source })?;

        let author = self.author_link(&record.author).await;
        let date = self.creation_date(id).await;
        let body = self.render_body(&record.body).await;
        let tags = self.fetch_tag_fragment(id).await;

        let id_text = id.to_string();
        let mut html = Markup::trusted(format!(
            concat!(
                r#"<article class="post" data-post-id="{id}">"#,
                r#"<header class="post-header">"#,
                r##"<a class="post-id" href="{link}">#{id}</a> "##,
                r#"<span class="post-author">{author}</span> "#,
                r#"<time class="post-date">{date}</time>"#,
                r#"</header>"#,
            ),
            id = id_text,
            link = escape_attr(&self.config.permalink(&id_text)),
            author = author,
            date = escape_text(&date),
        ));
        html.push(&body);
        html.push(&Markup::trusted(ACTION_FOOTER));
        html.push(&Markup::trusted(format!(
            concat!(
                r#"<div class="post-meta">"#,
                r#"<span class="net-score">{score}</span>"#,
                r#"{tags}"#,
                r#"<span class="reply-count">{replies}</span>"#,
                r#"</div>"#,
                r#"</article>"#,
            ),
            score = net_score(record.upvotes, record.downvotes),
            tags = tags,
            replies = record.reply_ids.len(),
        )));
        Ok(html)
    }

    /// Resolved name when available, otherwise a shortened address.
    pub async fn author_link(&self, address: &str) -> Markup {
        let href = escape_attr(&self.config.permalink(address)).into_owned();
        match self.names.lookup_address(address).await {
            Ok(Some(name)) if !name.is_empty() => {
                return Markup::trusted(format!(r#"<a href="{href}" class="ens-link">{}</a>"#, escape_text(&name)));
            }
            Ok(_) => debug!(address, "no reverse name"),
            Err(e) => warn!(address, "name lookup failed: {e}"),
        }
        Markup::trusted(format!(
            r#"<a href="{href}" class="address-link">{}</a>"#,
            escape_text(&shorten_address(address))
        ))
    }

    /// Creation event, then its block timestamp. Any gap yields the placeholder.
    pub async fn creation_date(&self, id: PostId) -> String {
        let events = match self.ledger.query_filter(&EventFilter::post_created(id)).await {
            Ok(events) => events,
            Err(e) => {
                warn!(post_id = id, "creation event lookup failed: {e}");
                return UNKNOWN_DATE_LABEL.to_string();
            }
        };
        let Some(event) = events.first() else {
            debug!(post_id = id, "no creation event indexed");
            return UNKNOWN_DATE_LABEL.to_string();
        };
        let block = match self.blocks.get_block(event.block_number()).await {
            Ok(b) => b,
            Err(e) => {
                warn!(post_id = id, block = event.block_number(), "block lookup failed: {e}");
                return UNKNOWN_DATE_LABEL.to_string();
            }
        };
        chain_time_to_local(block.timestamp, self.config.display_offset)
            .map(format_display_date)
            .unwrap_or_else(|| UNKNOWN_DATE_LABEL.to_string())
    }

    pub async fn render_body(&self, body: &str) -> Markup {
        if is_url(body) {
            synthesize_embed(body, POST_CONTENT_CLASS, self.probe.as_ref()).await
        } else {
            Markup::trusted(format!(r#"<div class="{POST_CONTENT_CLASS}">{}</div>"#, Markup::text(body)))
        }
    }

    /// Tags in event-log order, with payloads resolved inline or through the
    /// tag directory.
    pub async fn fetch_tags(&self, post_id: PostId) -> Result<Vec<TagRecord>, LedgerError> {
        let events = self.ledger.query_filter(&EventFilter::post_tagged(post_id)).await?;
        let lookups = events.into_iter().filter_map(|event| match event {
            LedgerEvent::PostTagged { tag_name, payload, .. } => Some(self.resolve_tag(tag_name, payload)),
            _ => None,
        });
        Ok(join_all(lookups).await)
    }

    async fn resolve_tag(&self, name: String, inline: Option<String>) -> TagRecord {
        if inline.is_some() {
            return TagRecord { name, payload: inline };
        }
        let Some(directory) = &self.tag_directory else {
            return TagRecord { name, payload: None };
        };
        let payload = match directory.tag_payload(&name).await {
            Ok(p) => p,
            Err(e) => {
                warn!(tag = %name, "tag detail lookup failed: {e}");
                None
            }
        };
        TagRecord { name, payload }
    }

    pub async fn fetch_tag_fragment(&self, post_id: PostId) -> Markup {
        let tags = match self.fetch_tags(post_id).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!(post_id, "tag query failed: {e}");
                return Markup::trusted(TAGS_UNAVAILABLE);
            }
        };
        if tags.is_empty() {
            return Markup::trusted(NO_TAGS);
        }
        let mut list = Markup::trusted(r#"<div class="tag-container">"#);
        for tag in &tags {
            list.push(&self.render_tag(tag).await);
        }
        list.push(&Markup::trusted("</div>"));
        list
    }

    /// The permalink anchor sits beside any embed; frames and players may not
    /// nest inside `<a>`.
    async fn render_tag(&self, tag: &TagRecord) -> Markup {
        let mut item = Markup::trusted(format!(
            r#"<a class="tag-link" href="{}">{}</a>"#,
            escape_attr(&self.config.permalink(&tag.name)),
            Markup::text(&truncate_tag(&tag.name))
        ));
        if let Some(payload) = tag.payload.as_deref().filter(|p| is_url(p)) {
            item.push(&synthesize_embed(payload, TAG_CONTENT_CLASS, self.probe.as_ref()).await);
        }
        item
    }
}
