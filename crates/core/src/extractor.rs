use crate::error::ExtractError;
use crate::frequency::{ngrams, FrequencyMap};
use crate::geo::{self, GeoResolver, NoGeoResolver};
use crate::links::{anon_twitter_link, extract_website, include_link};
use crate::models::{ConnectionKind, NormalizedDocument, UserConnection};
use crate::post::{parse_created_at, Entities, RawPost};
use crate::stoplists::StopLists;
use crate::text::{anonymize, Tokeniser};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

/// Turns a post, and every post embedded in it, into stored documents.
pub struct DocumentExtractor {
    tokeniser: Tokeniser,
    stoplists: StopLists,
    geo_resolver: Arc<dyn GeoResolver>,
    geo_level: u8,
}

impl DocumentExtractor {
    pub fn new(tokeniser: Tokeniser, stoplists: StopLists) -> Self {
        Self {
            tokeniser,
            stoplists,
            geo_resolver: Arc::new(NoGeoResolver),
            geo_level: 0,
        }
    }

    /// Region lookup down to `level`; `0` leaves region fields off documents.
    pub fn with_geo(mut self, resolver: Arc<dyn GeoResolver>, level: u8) -> Self {
        self.geo_resolver = resolver;
        self.geo_level = level.min(geo::MAX_REGION_LEVEL);
        self
    }

    /// The post's own document first, then its retweeted and quoted posts,
    /// depth first. A post from a denied source is dropped together with
    /// everything embedded in it.
    pub fn extract(&self, post: &RawPost) -> Result<Vec<NormalizedDocument>, ExtractError> {
        let mut documents = Vec::new();
        let mut pending = vec![post];

        while let Some(next) = pending.pop() {
            if let Some(source) = next.source.as_deref() {
                if self.stoplists.is_denied_source(source) {
                    debug!(post_id = %next.id_str, source, "excluded post source");
                    continue;
                }
            }

            documents.push(self.extract_document(next)?);

            pending.extend(next.quoted_status.as_deref());
            pending.extend(next.retweeted_status.as_deref());
        }

        Ok(documents)
    }

    fn extract_document(&self, post: &RawPost) -> Result<NormalizedDocument, ExtractError> {
        let user = &post.user;

        let reply_id = non_empty(post.in_reply_to_status_id_str.as_deref()).map(str::to_string);
        let reply_to_username = reply_id
            .as_ref()
            .and(non_empty(post.in_reply_to_screen_name.as_deref()))
            .map(hash_username);

        let retweet = post.retweeted_status.as_deref();
        let (retweeted_id, retweeted_username) = retweet
            .map(|embedded| (embedded.id_str.clone(), hash_username(&embedded.user.screen_name)))
            .unzip();

        // a retweet of a quote is classified as a plain retweet
        let quote = post.quoted_status.as_deref().filter(|_| retweet.is_none());
        let (quoted_id, quoted_username) = quote
            .map(|embedded| (embedded.id_str.clone(), hash_username(&embedded.user.screen_name)))
            .unzip();

        let text = post.display_text()?;
        let entities = post.display_entities()?;
        let timestamp = post.timestamp_millis()?;
        let profile_created_timestamp = match user.created_at.as_deref() {
            Some(raw) => parse_created_at("user.created_at", raw)?,
            None => 0,
        };

        let hashtags: FrequencyMap = entities
            .hashtags
            .iter()
            .map(|hashtag| hashtag.text.to_lowercase())
            .collect();
        let mentions: FrequencyMap = entities
            .user_mentions
            .iter()
            .map(|mention| hash_username(&mention.screen_name))
            .collect();
        let links = self.link_counts(&post.id_str, entities);
        let media = media_counts(entities);
        let symbols: FrequencyMap = entities.symbols.iter().map(|symbol| &symbol.text).collect();

        let anon_text = anonymize(text);
        let tokens = self.tokeniser.tokenise(&anon_text);
        let unfiltered_types: FrequencyMap = tokens.iter().collect();
        let types: FrequencyMap = tokens
            .iter()
            .filter(|token| self.keeps_type(token) && !hashtags.contains(token))
            .collect();

        let profile = self.profile_types(user.description.as_deref());

        let post_estimate = geo::post_estimate(post);
        let profile_estimate = geo::profile_estimate(user);
        let geo_fields = (self.geo_level > 0).then(|| {
            geo::resolve_fields(
                self.geo_resolver.as_ref(),
                post_estimate,
                profile_estimate,
                self.geo_level,
            )
        });

        let user_connections = user_connections(
            &mentions,
            retweeted_username.as_deref(),
            quoted_username.as_deref(),
            reply_to_username.as_deref(),
        );

        Ok(NormalizedDocument {
            tweet_id: post.id_str.clone(),
            username: hash_username(&user.screen_name),

            is_reply: reply_id.is_some(),
            reply_id,
            reply_to_username,

            is_quote: quoted_id.is_some(),
            quoted_id,
            quoted_username,

            is_retweet: retweeted_id.is_some(),
            retweeted_id,
            retweeted_username,

            quote_count: post.quote_count.unwrap_or_default(),
            reply_count: post.reply_count.unwrap_or_default(),
            retweet_count: post.retweet_count,
            favorite_count: post.favorite_count,

            is_truncated: post.truncated,
            has_extended: post.is_extended(),
            computed_text: tokens.join(" "),
            text: anon_text,
            types: types.terms(),
            unfiltered_types: unfiltered_types.terms(),
            bi_grams: ngrams(&tokens, 2).terms(),
            tri_grams: ngrams(&tokens, 3).terms(),
            unfiltered_type_counts: unfiltered_types.term_counts(),

            hashtags: hashtags.terms(),
            user_mentions: mentions.terms(),
            urls: links.urls.terms(),
            simple_urls: links.simple_urls.terms(),
            unwound_urls: links.unwound_urls.terms(),
            websites: links.websites.terms(),
            simple_websites: links.simple_websites.terms(),
            unwound_websites: links.unwound_websites.terms(),
            url_titles: links.titles.terms(),
            url_title_types: links.title_types.terms(),
            url_description_types: links.description_types.terms(),
            media_files: media.files.terms(),
            media_urls: media.urls.terms(),
            media_websites: media.websites.terms(),
            media_formats: media.formats.terms(),
            symbols: symbols.terms(),

            profile_text: profile.text,
            profile_types: profile.types.terms(),
            unfiltered_profile_types: profile.unfiltered_types.terms(),
            profile_verified: user.verified,
            profile_followers_count: user.followers_count,
            profile_friends_count: user.friends_count,
            profile_listed_count: user.listed_count,
            profile_favourites_count: user.favourites_count,
            profile_statuses_count: user.statuses_count,
            profile_created_timestamp,

            tweet_geo_coord: post_estimate.map(|estimate| estimate.point),
            tweet_geo_description: post
                .place
                .as_ref()
                .map(|place| format!("{} ({})", place.full_name, place.country))
                .unwrap_or_default(),
            profile_geo_coord: profile_estimate.map(|estimate| estimate.point),
            profile_geo_descrption: user.location.clone().unwrap_or_default(),

            timestamp,
            source: post.source.clone(),
            user_connections,

            geo: geo_fields,
        })
    }

    fn keeps_type(&self, token: &str) -> bool {
        token.chars().nth(1).is_some() && !self.stoplists.is_stopword(token)
    }

    fn profile_types(&self, description: Option<&str>) -> ProfileTypes {
        let Some(description) = non_empty(description) else {
            return ProfileTypes::default();
        };

        let text = anonymize(description);
        let tokens = self.tokeniser.tokenise(&text);
        ProfileTypes {
            types: tokens.iter().filter(|token| self.keeps_type(token)).collect(),
            unfiltered_types: tokens.iter().collect(),
            text,
        }
    }

    fn link_counts(&self, post_id: &str, entities: &Entities) -> LinkCounts {
        let mut counts = LinkCounts::default();

        for url in &entities.urls {
            let Some(expanded) = non_empty(url.expanded_url.as_deref()) else {
                continue;
            };
            counts.simple_urls.add(expanded);
            counts.simple_websites.extend(extract_website(expanded));

            let mut link = expanded;
            if let Some(unwound) = &url.unwound {
                if let Some(target) = non_empty(unwound.url.as_deref()) {
                    link = target;
                    counts.unwound_urls.add(target);
                    counts.unwound_websites.extend(extract_website(target));
                }
                if let Some(title) = non_empty(unwound.title.as_deref()) {
                    let title = anonymize(title);
                    counts.title_types.extend(self.tokeniser.tokenise(&title));
                    counts.titles.add(&title);
                }
                if let Some(description) = non_empty(unwound.description.as_deref()) {
                    let description = anonymize(description);
                    counts
                        .description_types
                        .extend(self.tokeniser.tokenise(&description));
                }
            }

            if include_link(link, post_id) {
                let link = anon_twitter_link(link);
                counts.websites.extend(extract_website(&link));
                counts.urls.add(&link);
            }
        }

        counts
    }
}

#[derive(Default)]
struct LinkCounts {
    urls: FrequencyMap,
    simple_urls: FrequencyMap,
    unwound_urls: FrequencyMap,
    websites: FrequencyMap,
    simple_websites: FrequencyMap,
    unwound_websites: FrequencyMap,
    titles: FrequencyMap,
    title_types: FrequencyMap,
    description_types: FrequencyMap,
}

#[derive(Default)]
struct MediaCounts {
    files: FrequencyMap,
    urls: FrequencyMap,
    websites: FrequencyMap,
    formats: FrequencyMap,
}

#[derive(Default)]
struct ProfileTypes {
    text: String,
    types: FrequencyMap,
    unfiltered_types: FrequencyMap,
}

fn media_counts(entities: &Entities) -> MediaCounts {
    let mut counts = MediaCounts::default();
    for item in &entities.media {
        counts
            .files
            .extend(item.media_url_https.as_deref().or(item.media_url.as_deref()));
        counts.urls.add(&item.expanded_url);
        counts.formats.add(&item.kind);
        counts.websites.extend(extract_website(&item.expanded_url));
    }
    counts
}

/// One entry per referenced user, in mention order, accumulating every
/// relation that applies.
fn user_connections(
    mentions: &FrequencyMap,
    retweeted: Option<&str>,
    quoted: Option<&str>,
    replied_to: Option<&str>,
) -> Vec<UserConnection> {
    let mut connections: Vec<UserConnection> = mentions
        .iter()
        .map(|(user, _)| UserConnection {
            user: user.to_string(),
            conn: vec![ConnectionKind::Mention],
        })
        .collect();

    let related = [
        (retweeted, ConnectionKind::Retweet),
        (quoted, ConnectionKind::Quote),
        (replied_to, ConnectionKind::Reply),
    ];
    for (user, kind) in related {
        let Some(user) = user else { continue };
        match connections.iter_mut().find(|connection| connection.user == user) {
            Some(connection) => connection.conn.push(kind),
            None => connections.push(UserConnection {
                user: user.to_string(),
                conn: vec![kind],
            }),
        }
    }

    connections
}

/// `uname_` followed by the SHA-256 of the lower-cased name.
pub fn hash_username(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.to_lowercase().as_bytes());
    format!("uname_{:x}", hasher.finalize())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
