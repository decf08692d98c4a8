//! Composable search predicates over books.
//!
//! A [`BookSpecification`] is a conjunction of [`SearchCriterion`]s built from whichever
//! filters a caller supplied. It can be evaluated against a book in memory or rendered as
//! a parameterised SQL `WHERE` clause for the postgres repository.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio_postgres::types::ToSql;

use crate::api::{Book, BookSearchQuery};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SearchOperation {
    /// Exact match
    Equal,
    /// Case insensitive substring match, text values only
    Like,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BookField {
    Title,
    Author,
    PublicationDate,
    Category,
    Isbn,
    Rating,
    Price,
    Visible,
}

impl BookField {
    pub fn column(&self) -> &'static str {
        match self {
            BookField::Title => "title",
            BookField::Author => "author",
            BookField::PublicationDate => "publication_date",
            BookField::Category => "category",
            BookField::Isbn => "isbn",
            BookField::Rating => "rating",
            BookField::Price => "price",
            BookField::Visible => "visible",
        }
    }

    fn value_of(&self, book: &Book) -> Option<CriterionValue> {
        match self {
            BookField::Title => Some(CriterionValue::Text(book.title.clone())),
            BookField::Author => Some(CriterionValue::Text(book.author.clone())),
            BookField::PublicationDate => book.publication_date.map(CriterionValue::Date),
            BookField::Category => book.category.clone().map(CriterionValue::Text),
            BookField::Isbn => book.isbn.clone().map(CriterionValue::Text),
            BookField::Rating => book.rating.map(CriterionValue::Integer),
            BookField::Price => Some(CriterionValue::Decimal(book.price)),
            BookField::Visible => Some(CriterionValue::Boolean(book.visible)),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CriterionValue {
    Text(String),
    Date(NaiveDate),
    Integer(i32),
    Decimal(Decimal),
    Boolean(bool),
}

impl CriterionValue {
    fn into_sql_param(self) -> Box<dyn ToSql + Sync + Send> {
        match self {
            CriterionValue::Text(value) => Box::new(value),
            CriterionValue::Date(value) => Box::new(value),
            CriterionValue::Integer(value) => Box::new(value),
            CriterionValue::Decimal(value) => Box::new(value),
            CriterionValue::Boolean(value) => Box::new(value),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SearchCriterion {
    pub field: BookField,
    pub value: CriterionValue,
    pub operation: SearchOperation,
}

impl SearchCriterion {
    pub fn equal(field: BookField, value: CriterionValue) -> Self {
        Self {
            field,
            value,
            operation: SearchOperation::Equal,
        }
    }

    pub fn like(field: BookField, value: &str) -> Self {
        Self {
            field,
            value: CriterionValue::Text(value.to_string()),
            operation: SearchOperation::Like,
        }
    }

    pub fn is_satisfied_by(&self, book: &Book) -> bool {
        let Some(book_value) = self.field.value_of(book) else {
            return false;
        };
        match (self.operation, &self.value, &book_value) {
            (SearchOperation::Equal, expected, actual) => expected == actual,
            (SearchOperation::Like, CriterionValue::Text(pattern), CriterionValue::Text(text)) => {
                text.to_lowercase().contains(&pattern.to_lowercase())
            }
            (SearchOperation::Like, _, _) => false,
        }
    }

    /// Renders the criterion using `$placeholder` for its single parameter
    fn to_sql(&self, placeholder: usize) -> (String, Box<dyn ToSql + Sync + Send>) {
        let column = self.field.column();
        match (self.operation, &self.value) {
            (SearchOperation::Like, CriterionValue::Text(pattern)) => (
                format!("LOWER({column}) LIKE ${placeholder}"),
                Box::new(format!("%{}%", escape_like(&pattern.to_lowercase()))),
            ),
            (_, value) => (
                format!("{column} = ${placeholder}"),
                value.clone().into_sql_param(),
            ),
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        if matches!(character, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}

/// `WHERE` clause and the parameters it references, in placeholder order
pub struct SqlPredicate {
    pub clause: String,
    pub params: Vec<Box<dyn ToSql + Sync + Send>>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BookSpecification {
    criteria: Vec<SearchCriterion>,
}

impl BookSpecification {
    /// Specification matching every book
    pub fn all() -> Self {
        Self::default()
    }

    /// Combines the filters that are set with AND, blank text filters are ignored
    pub fn from_filters(filters: &BookSearchQuery) -> Self {
        // whitespace only counts as absent, other values are matched as typed
        let non_blank = |value: &Option<String>| -> Option<String> {
            value
                .as_deref()
                .filter(|value| !value.trim().is_empty())
                .map(str::to_string)
        };

        let mut specification = Self::all();
        if let Some(title) = non_blank(&filters.title) {
            specification = specification.and(SearchCriterion::like(BookField::Title, &title));
        }
        if let Some(author) = non_blank(&filters.author) {
            specification = specification.and(SearchCriterion::like(BookField::Author, &author));
        }
        if let Some(publication_date) = filters.publication_date {
            specification = specification.and(SearchCriterion::equal(
                BookField::PublicationDate,
                CriterionValue::Date(publication_date),
            ));
        }
        if let Some(category) = non_blank(&filters.category) {
            specification =
                specification.and(SearchCriterion::like(BookField::Category, &category));
        }
        if let Some(isbn) = non_blank(&filters.isbn) {
            specification = specification.and(SearchCriterion::equal(
                BookField::Isbn,
                CriterionValue::Text(isbn),
            ));
        }
        if let Some(rating) = filters.rating {
            specification = specification.and(SearchCriterion::equal(
                BookField::Rating,
                CriterionValue::Integer(rating),
            ));
        }
        if let Some(price) = filters.price {
            specification = specification.and(SearchCriterion::equal(
                BookField::Price,
                CriterionValue::Decimal(price),
            ));
        }
        if let Some(visible) = filters.visible {
            specification = specification.and(SearchCriterion::equal(
                BookField::Visible,
                CriterionValue::Boolean(visible),
            ));
        }
        specification
    }

    pub fn and(mut self, criterion: SearchCriterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn criteria(&self) -> &[SearchCriterion] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn is_satisfied_by(&self, book: &Book) -> bool {
        self.criteria
            .iter()
            .all(|criterion| criterion.is_satisfied_by(book))
    }

    /// Renders the specification as `WHERE ...` numbering placeholders from `first_placeholder`.
    /// An empty specification renders an empty clause.
    pub fn to_sql_where(&self, first_placeholder: usize) -> SqlPredicate {
        if self.criteria.is_empty() {
            return SqlPredicate {
                clause: String::new(),
                params: vec![],
            };
        }

        let (conditions, params): (Vec<String>, Vec<_>) = self
            .criteria
            .iter()
            .enumerate()
            .map(|(index, criterion)| criterion.to_sql(first_placeholder + index))
            .unzip();

        SqlPredicate {
            clause: format!("WHERE {}", conditions.join(" AND ")),
            params,
        }
    }
}
