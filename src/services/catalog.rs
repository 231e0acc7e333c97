use crate::{
    entities::{
        category, manufacturer, product, product_image, product_review, stock_entry, Category,
        CategoryModel, Manufacturer, Product, ProductImage, ProductImageModel, ProductModel,
        ProductReview, StockEntryKind, User, UserKind,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;
const SUGGESTION_PRODUCT_LIMIT: u64 = 5;
const SUGGESTION_CATEGORY_LIMIT: u64 = 3;

/// Product catalog: browsing, search, reviews and the admin product CRUD.
///
/// Every price leaving this service is resolved against the shopper's kind
/// first; raw patient/pharmacy price pairs stay internal.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Paginated product cards with resolved prices, filtered by category
    /// slug, name search and featured flag.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: ProductListQuery,
        shopper: Option<UserKind>,
    ) -> Result<(Vec<ProductCard>, u64), ServiceError> {
        let page = query.page();
        let per_page = query.per_page();

        let mut select = Product::find().filter(product::Column::IsActive.eq(true));

        if let Some(slug) = &query.category {
            let Some(cat) = Category::find()
                .filter(category::Column::Slug.eq(slug.clone()))
                .one(&*self.db)
                .await?
            else {
                return Ok((Vec::new(), 0));
            };
            select = select.filter(product::Column::CategoryId.eq(cat.id));
        }
        if let Some(q) = &query.q {
            select = select.filter(product::Column::Name.contains(q));
        }
        if let Some(featured) = query.featured {
            select = select.filter(product::Column::IsFeatured.eq(featured));
        }

        let paginator = select
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        let cards = self.build_cards(products, shopper).await?;
        Ok((cards, total))
    }

    /// Full product page by slug. Bumps the view counter as a side effect.
    #[instrument(skip(self))]
    pub async fn get_product_by_slug(
        &self,
        slug: &str,
        shopper: Option<UserKind>,
    ) -> Result<ProductDetail, ServiceError> {
        let product = Product::find()
            .filter(product::Column::Slug.eq(slug))
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        Product::update_many()
            .col_expr(
                product::Column::ViewCount,
                Expr::col(product::Column::ViewCount).add(1),
            )
            .filter(product::Column::Id.eq(product.id))
            .exec(&*self.db)
            .await?;

        let category = Category::find_by_id(product.category_id)
            .one(&*self.db)
            .await?;
        let manufacturer = match product.manufacturer_id {
            Some(id) => Manufacturer::find_by_id(id).one(&*self.db).await?,
            None => None,
        };

        let images = ProductImage::find()
            .filter(product_image::Column::ProductId.eq(product.id))
            .order_by_asc(product_image::Column::SortOrder)
            .all(&*self.db)
            .await?;

        let reviews = self.reviews_with_authors(product.id).await?;
        let (rating_average, rating_count) = rating_summary(reviews.iter().map(|r| r.rating));

        let price = product.price_for(shopper);
        let in_stock = product.in_stock();
        Ok(ProductDetail {
            id: product.id,
            name: product.name,
            slug: product.slug,
            category: category.map(|c| c.name),
            manufacturer: manufacturer.map(|m| m.name),
            composition: product.composition,
            description: product.description,
            mrp_price: product.mrp_price,
            price,
            discount_percentage: discount_percentage(product.mrp_price, price),
            prescription_required: product.prescription_required,
            in_stock,
            stock_quantity: product.track_inventory.then_some(product.stock_quantity),
            is_featured: product.is_featured,
            images: images.into_iter().map(ProductImagePayload::from).collect(),
            rating_average,
            rating_count,
            reviews,
        })
    }

    /// Flat quick-view payload for the storefront's hover card.
    #[instrument(skip(self))]
    pub async fn quick_view(
        &self,
        product_id: Uuid,
        shopper: Option<UserKind>,
    ) -> Result<QuickView, ServiceError> {
        let product = Product::find_by_id(product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let category = Category::find_by_id(product.category_id)
            .one(&*self.db)
            .await?;
        let manufacturer = match product.manufacturer_id {
            Some(id) => Manufacturer::find_by_id(id).one(&*self.db).await?,
            None => None,
        };
        let image = ProductImage::find()
            .filter(product_image::Column::ProductId.eq(product.id))
            .filter(product_image::Column::IsPrimary.eq(true))
            .one(&*self.db)
            .await?;

        let user_price = product.price_for(shopper);
        let in_stock = product.in_stock();
        Ok(QuickView {
            id: product.id,
            name: product.name,
            slug: product.slug,
            manufacturer: manufacturer.map(|m| m.name),
            category: category.map(|c| c.name),
            description: product.description,
            mrp_price: product.mrp_price,
            user_price,
            discount_percentage: discount_percentage(product.mrp_price, user_price),
            prescription_required: product.prescription_required,
            in_stock,
            stock_quantity: product.track_inventory.then_some(product.stock_quantity),
            image: image.map(ProductImagePayload::from),
        })
    }

    /// Typeahead suggestions. Queries shorter than two characters return
    /// nothing rather than scanning the whole catalog.
    #[instrument(skip(self))]
    pub async fn search_suggestions(
        &self,
        query: &str,
    ) -> Result<SearchSuggestions, ServiceError> {
        let query = query.trim();
        if query.chars().count() < 2 {
            return Ok(SearchSuggestions::default());
        }

        let products = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::Name.contains(query))
            .order_by_asc(product::Column::Name)
            .limit(SUGGESTION_PRODUCT_LIMIT)
            .all(&*self.db)
            .await?;

        let categories = Category::find()
            .filter(category::Column::IsActive.eq(true))
            .filter(category::Column::Name.contains(query))
            .order_by_asc(category::Column::Name)
            .limit(SUGGESTION_CATEGORY_LIMIT)
            .all(&*self.db)
            .await?;

        Ok(SearchSuggestions {
            products: products
                .into_iter()
                .map(|p| Suggestion {
                    name: p.name,
                    slug: p.slug,
                })
                .collect(),
            categories: categories
                .into_iter()
                .map(|c| Suggestion {
                    name: c.name,
                    slug: c.slug,
                })
                .collect(),
        })
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Category::find()
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::SortOrder)
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn list_reviews(&self, product_id: Uuid) -> Result<Vec<ReviewEntry>, ServiceError> {
        Product::find_by_id(product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        self.reviews_with_authors(product_id).await
    }

    /// One review per shopper per product; resubmitting replaces the
    /// earlier rating and comment.
    #[instrument(skip(self))]
    pub async fn submit_review(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        input: SubmitReviewInput,
    ) -> Result<ReviewEntry, ServiceError> {
        input.validate()?;

        Product::find_by_id(product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let existing = ProductReview::find()
            .filter(product_review::Column::ProductId.eq(product_id))
            .filter(product_review::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?;

        let review = match existing {
            Some(review) => {
                let mut active: product_review::ActiveModel = review.into();
                active.rating = Set(input.rating);
                active.comment = Set(input.comment);
                active.updated_at = Set(Utc::now());
                active.update(&*self.db).await?
            }
            None => {
                let now = Utc::now();
                let review = product_review::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(product_id),
                    user_id: Set(user_id),
                    rating: Set(input.rating),
                    comment: Set(input.comment),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                review.insert(&*self.db).await?
            }
        };

        self.event_sender
            .send_or_log(Event::ReviewSubmitted {
                product_id,
                user_id,
            })
            .await;

        let reviewer = User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .map(|u| u.full_name)
            .unwrap_or_default();
        Ok(ReviewEntry {
            id: review.id,
            rating: review.rating,
            comment: review.comment,
            reviewer,
            created_at: review.created_at,
        })
    }

    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;

        Category::find_by_id(input.category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;
        if let Some(id) = input.manufacturer_id {
            Manufacturer::find_by_id(id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Manufacturer not found".to_string()))?;
        }

        let slug = match input.slug {
            Some(slug) => slug,
            None => slugify(&input.name),
        };
        let existing = Product::find()
            .filter(product::Column::Slug.eq(slug.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Product slug already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(slug),
            category_id: Set(input.category_id),
            manufacturer_id: Set(input.manufacturer_id),
            composition: Set(input.composition),
            description: Set(input.description),
            prescription_required: Set(input.prescription_required),
            mrp_price: Set(input.mrp_price),
            patient_price: Set(input.patient_price),
            pharmacy_price: Set(input.pharmacy_price),
            stock_quantity: Set(input.stock_quantity),
            low_stock_threshold: Set(input.low_stock_threshold.unwrap_or(10)),
            track_inventory: Set(input.track_inventory),
            is_active: Set(true),
            is_featured: Set(input.is_featured),
            view_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let txn = self.db.begin().await?;
        let product = product.insert(&txn).await?;

        // The cached quantity is the ledger sum, so a nonzero opening stock
        // needs a matching ledger row or the first movement would trample it.
        if product.stock_quantity > 0 {
            let opening = stock_entry::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product.id),
                kind: Set(StockEntryKind::In),
                quantity: Set(product.stock_quantity),
                reference: Set(Some("Initial stock".to_string())),
                recorded_by: Set(None),
                created_at: Set(now),
            };
            opening.insert(&txn).await?;
        }
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product.id))
            .await;

        info!("Created product {} ({})", product.slug, product.id);
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;

        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if let Some(slug) = &input.slug {
            let taken = Product::find()
                .filter(product::Column::Slug.eq(slug.clone()))
                .filter(product::Column::Id.ne(product_id))
                .one(&*self.db)
                .await?;
            if taken.is_some() {
                return Err(ServiceError::Conflict(
                    "Product slug already exists".to_string(),
                ));
            }
        }

        let mut active: product::ActiveModel = product.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(slug) = input.slug {
            active.slug = Set(slug);
        }
        if let Some(category_id) = input.category_id {
            Category::find_by_id(category_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;
            active.category_id = Set(category_id);
        }
        if let Some(composition) = input.composition {
            active.composition = Set(Some(composition));
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(rx) = input.prescription_required {
            active.prescription_required = Set(rx);
        }
        if let Some(mrp) = input.mrp_price {
            active.mrp_price = Set(mrp);
        }
        if let Some(price) = input.patient_price {
            active.patient_price = Set(price);
        }
        if let Some(price) = input.pharmacy_price {
            active.pharmacy_price = Set(price);
        }
        if let Some(threshold) = input.low_stock_threshold {
            active.low_stock_threshold = Set(threshold);
        }
        if let Some(track) = input.track_inventory {
            active.track_inventory = Set(track);
        }
        if let Some(featured) = input.is_featured {
            active.is_featured = Set(featured);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());
        let product = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(product.id))
            .await;

        info!("Updated product {}", product.id);
        Ok(product)
    }

    /// Attaches an image. The first image of a product always becomes
    /// primary; promoting a later one demotes the previous primary in the
    /// same transaction.
    #[instrument(skip(self, input))]
    pub async fn add_product_image(
        &self,
        product_id: Uuid,
        input: AddProductImageInput,
    ) -> Result<ProductImageModel, ServiceError> {
        input.validate()?;
        if BASE64.decode(&input.data).is_err() {
            return Err(ServiceError::ValidationError(
                "Invalid image data".to_string(),
            ));
        }

        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let existing = ProductImage::find()
            .filter(product_image::Column::ProductId.eq(product_id))
            .count(&*self.db)
            .await?;
        let is_primary = input.is_primary || existing == 0;

        let txn = self.db.begin().await?;

        if is_primary && existing > 0 {
            ProductImage::update_many()
                .col_expr(product_image::Column::IsPrimary, Expr::value(false))
                .filter(product_image::Column::ProductId.eq(product_id))
                .filter(product_image::Column::IsPrimary.eq(true))
                .exec(&txn)
                .await?;
        }

        let image = product_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            image_data: Set(input.data),
            content_type: Set(input.content_type),
            alt_text: Set(input.alt_text),
            is_primary: Set(is_primary),
            sort_order: Set(input.sort_order.unwrap_or(existing as i32)),
            created_at: Set(Utc::now()),
        };
        let image = image.insert(&txn).await?;

        txn.commit().await?;

        info!("Added image {} to product {}", image.id, product_id);
        Ok(image)
    }

    async fn build_cards(
        &self,
        products: Vec<ProductModel>,
        shopper: Option<UserKind>,
    ) -> Result<Vec<ProductCard>, ServiceError> {
        let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let category_ids: Vec<Uuid> = products.iter().map(|p| p.category_id).collect();
        let manufacturer_ids: Vec<Uuid> =
            products.iter().filter_map(|p| p.manufacturer_id).collect();

        let categories: HashMap<Uuid, String> = if category_ids.is_empty() {
            HashMap::new()
        } else {
            Category::find()
                .filter(category::Column::Id.is_in(category_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect()
        };
        let manufacturers: HashMap<Uuid, String> = if manufacturer_ids.is_empty() {
            HashMap::new()
        } else {
            Manufacturer::find()
                .filter(manufacturer::Column::Id.is_in(manufacturer_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|m| (m.id, m.name))
                .collect()
        };

        let mut images: HashMap<Uuid, ProductImagePayload> = if product_ids.is_empty() {
            HashMap::new()
        } else {
            ProductImage::find()
                .filter(product_image::Column::ProductId.is_in(product_ids.clone()))
                .filter(product_image::Column::IsPrimary.eq(true))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|img| (img.product_id, ProductImagePayload::from(img)))
                .collect()
        };

        let mut ratings: HashMap<Uuid, (i64, i64)> = HashMap::new();
        if !product_ids.is_empty() {
            let reviews = ProductReview::find()
                .filter(product_review::Column::ProductId.is_in(product_ids))
                .all(&*self.db)
                .await?;
            for review in reviews {
                let entry = ratings.entry(review.product_id).or_insert((0, 0));
                entry.0 += 1;
                entry.1 += i64::from(review.rating);
            }
        }

        Ok(products
            .into_iter()
            .map(|p| {
                let price = p.price_for(shopper);
                let in_stock = p.in_stock();
                let (count, sum) = ratings.get(&p.id).copied().unwrap_or((0, 0));
                ProductCard {
                    id: p.id,
                    name: p.name,
                    slug: p.slug,
                    category: categories.get(&p.category_id).cloned(),
                    manufacturer: p.manufacturer_id.and_then(|id| manufacturers.get(&id).cloned()),
                    mrp_price: p.mrp_price,
                    price,
                    discount_percentage: discount_percentage(p.mrp_price, price),
                    prescription_required: p.prescription_required,
                    in_stock,
                    is_featured: p.is_featured,
                    rating_average: mean_rating(sum, count),
                    rating_count: count,
                    image: images.remove(&p.id),
                }
            })
            .collect())
    }

    async fn reviews_with_authors(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<ReviewEntry>, ServiceError> {
        let rows = ProductReview::find()
            .filter(product_review::Column::ProductId.eq(product_id))
            .find_also_related(User)
            .order_by_desc(product_review::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(review, user)| ReviewEntry {
                id: review.id,
                rating: review.rating,
                comment: review.comment,
                reviewer: user.map(|u| u.full_name).unwrap_or_default(),
                created_at: review.created_at,
            })
            .collect())
    }
}

/// Percent saved against MRP, rounded to one decimal. Zero when MRP is
/// zero or the resolved price is not below it.
pub(crate) fn discount_percentage(mrp: Decimal, price: Decimal) -> f64 {
    if mrp <= Decimal::ZERO || price >= mrp {
        return 0.0;
    }
    ((mrp - price) / mrp * Decimal::from(100))
        .round_dp(1)
        .to_f64()
        .unwrap_or(0.0)
}

/// Mean rating rounded to one decimal; zero when there are no reviews.
fn mean_rating(sum: i64, count: i64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (sum as f64 / count as f64 * 10.0).round() / 10.0
}

fn rating_summary(ratings: impl Iterator<Item = i32>) -> (f64, i64) {
    let (mut count, mut sum) = (0i64, 0i64);
    for rating in ratings {
        count += 1;
        sum += i64::from(rating);
    }
    (mean_rating(sum, count), count)
}

/// URL slug derived from a product name: lowercase alphanumerics with
/// single dashes between runs.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn default_track_inventory() -> bool {
    true
}

/// Filters for the product listing endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductListQuery {
    pub page: u64,
    pub per_page: u64,
    pub category: Option<String>,
    pub q: Option<String>,
    pub featured: Option<bool>,
}

impl ProductListQuery {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page,
            per_page,
            category: None,
            q: None,
            featured: None,
        }
    }

    /// Requested page, never below one.
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    /// Requested page size with an absent or zero value falling back to the
    /// default and oversized values capped.
    pub fn per_page(&self) -> u64 {
        if self.per_page == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.per_page.min(MAX_PAGE_SIZE)
        }
    }
}

/// Inline image payload served with products
#[derive(Debug, Clone, Serialize)]
pub struct ProductImagePayload {
    pub data: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

impl From<ProductImageModel> for ProductImagePayload {
    fn from(image: ProductImageModel) -> Self {
        Self {
            data: image.image_data,
            content_type: image.content_type,
            alt_text: image.alt_text,
        }
    }
}

/// Listing card with the shopper's resolved price
#[derive(Debug, Serialize)]
pub struct ProductCard {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub mrp_price: Decimal,
    pub price: Decimal,
    pub discount_percentage: f64,
    pub prescription_required: bool,
    pub in_stock: bool,
    pub is_featured: bool,
    pub rating_average: f64,
    pub rating_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ProductImagePayload>,
}

/// Full product page payload
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub composition: Option<String>,
    pub description: Option<String>,
    pub mrp_price: Decimal,
    pub price: Decimal,
    pub discount_percentage: f64,
    pub prescription_required: bool,
    pub in_stock: bool,
    pub stock_quantity: Option<i32>,
    pub is_featured: bool,
    pub images: Vec<ProductImagePayload>,
    pub rating_average: f64,
    pub rating_count: i64,
    pub reviews: Vec<ReviewEntry>,
}

/// Flat quick-view payload
#[derive(Debug, Serialize)]
pub struct QuickView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub mrp_price: Decimal,
    pub user_price: Decimal,
    pub discount_percentage: f64,
    pub prescription_required: bool,
    pub in_stock: bool,
    pub stock_quantity: Option<i32>,
    pub image: Option<ProductImagePayload>,
}

/// Typeahead results
#[derive(Debug, Default, Serialize)]
pub struct SearchSuggestions {
    pub products: Vec<Suggestion>,
    pub categories: Vec<Suggestion>,
}

#[derive(Debug, Serialize)]
pub struct Suggestion {
    pub name: String,
    pub slug: String,
}

/// Review joined with its author's display name
#[derive(Debug, Serialize)]
pub struct ReviewEntry {
    pub id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub reviewer: String,
    pub created_at: DateTime<Utc>,
}

/// Input for submitting a product review
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitReviewInput {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    pub comment: Option<String>,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub slug: Option<String>,
    pub category_id: Uuid,
    pub manufacturer_id: Option<Uuid>,
    pub composition: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub prescription_required: bool,
    pub mrp_price: Decimal,
    pub patient_price: Decimal,
    pub pharmacy_price: Decimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    pub low_stock_threshold: Option<i32>,
    #[serde(default = "default_track_inventory")]
    pub track_inventory: bool,
    #[serde(default)]
    pub is_featured: bool,
}

/// Input for updating a product; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub slug: Option<String>,
    pub category_id: Option<Uuid>,
    pub composition: Option<String>,
    pub description: Option<String>,
    pub prescription_required: Option<bool>,
    pub mrp_price: Option<Decimal>,
    pub patient_price: Option<Decimal>,
    pub pharmacy_price: Option<Decimal>,
    pub low_stock_threshold: Option<i32>,
    pub track_inventory: Option<bool>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
}

/// Input for attaching a product image
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddProductImageInput {
    pub data: String,
    #[validate(length(min = 1, max = 100))]
    pub content_type: String,
    pub alt_text: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    pub sort_order: Option<i32>,
}
