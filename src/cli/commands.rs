use std::sync::Arc;
use anyhow::{Context, Result};
use console::{style, Emoji};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    cli::args::*,
    database::{
        repositories::{PostgresOrderRepository, PostgresProductRepository, PostgresUserRepository},
        Database,
    },
    models::{
        cart::Cart,
        order::ShippingAddress,
        product::{ProductFilter, StoreProductRequest, UpdateProductRequest},
        user::{StoreUserRequest, UserResponse},
    },
    services::{
        AuthConfig, AuthService, AuthServiceError, CartService, CartServiceError, CatalogService,
        CatalogServiceError, DashboardService, OrderService, OrderServiceError, UserService,
        UserServiceError,
    },
    utils::{
        formatting::{
            format_cart_summary, format_cart_table, format_dashboard, format_date, format_money,
            format_order_detail, format_order_table, format_product_detail, format_product_table,
        },
        Config,
    },
};

static CHECKMARK: Emoji<'_, '_> = Emoji("✅ ", "");
static CROSS: Emoji<'_, '_> = Emoji("❌ ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️ ", "");
static INFO: Emoji<'_, '_> = Emoji("ℹ️ ", "");
static GIFT: Emoji<'_, '_> = Emoji("🎁 ", "");

pub struct CliApp {
    auth_service: Arc<AuthService>,
    user_service: Arc<UserService>,
    catalog_service: Arc<CatalogService>,
    cart_service: Arc<CartService>,
    order_service: Arc<OrderService>,
    dashboard_service: Arc<DashboardService>,
    image_base_url: Option<String>,
}

impl CliApp {
    pub fn new(config: &Config, database: &Database) -> Result<Self> {
        let pool = database.pool();
        let user_repo = Arc::new(PostgresUserRepository::new(pool.clone()));
        let product_repo = Arc::new(PostgresProductRepository::new(pool.clone()));
        let order_repo = Arc::new(PostgresOrderRepository::new(pool.clone()));

        // Initialize services
        let user_service = Arc::new(UserService::new(user_repo).with_admin_email(config.admin_email.clone()));
        let auth_service = Arc::new(AuthService::new(
            user_service.clone(),
            AuthConfig::new(&config.jwt_secret, &config.session_dir),
        )?);
        let catalog_service = Arc::new(CatalogService::new(product_repo.clone()));
        let cart_service = Arc::new(
            CartService::new(product_repo.clone(), &config.session_dir, config.shipping_fee)
                .context("Failed to initialize cart storage")?,
        );
        let order_service = Arc::new(OrderService::new(order_repo.clone(), config.shipping_fee));
        let dashboard_service = Arc::new(DashboardService::new(order_repo, product_repo));

        Ok(Self {
            auth_service,
            user_service,
            catalog_service,
            cart_service,
            order_service,
            dashboard_service,
            image_base_url: config.image_base_url.clone(),
        })
    }

    pub async fn run(&self, args: Args) -> Result<()> {
        match args.command {
            Commands::Auth { command } => self.handle_auth_command(command).await,
            Commands::Product { command } => self.handle_product_command(command).await,
            Commands::Cart { command } => self.handle_cart_command(command).await,
            Commands::Checkout(checkout) => self.handle_checkout(checkout).await,
            Commands::Order { command } => self.handle_order_command(command).await,
            Commands::Admin { command } => self.handle_admin_command(command).await,
        }
    }

    /// Resolve the logged-in user, printing a hint when there is none.
    async fn require_user(&self) -> Option<UserResponse> {
        match self.auth_service.get_current_user().await {
            Ok(user) => Some(user),
            Err(AuthServiceError::SessionNotFound) | Err(AuthServiceError::SessionExpired) => {
                println!("{} Please login first: {}", WARNING, style("gift-shop auth login").cyan());
                None
            }
            Err(e) => {
                println!("{} Authentication error: {}", CROSS, style(e).red());
                None
            }
        }
    }

    // Authentication Commands
    async fn handle_auth_command(&self, command: AuthCommands) -> Result<()> {
        match command {
            AuthCommands::Register => self.handle_register().await,
            AuthCommands::Login => self.handle_login().await,
            AuthCommands::Logout => self.handle_logout().await,
            AuthCommands::Status => self.handle_auth_status().await,
        }
    }

    async fn handle_register(&self) -> Result<()> {
        println!("{} {}", GIFT, style("Create your account").bold().cyan());

        let theme = ColorfulTheme::default();

        let name: String = Input::with_theme(&theme)
            .with_prompt("Full name")
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.trim().len() < 2 {
                    Err("Name must be at least 2 characters")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;

        let email: String = Input::with_theme(&theme)
            .with_prompt("Email")
            .validate_with(|input: &String| -> Result<(), &str> {
                if !input.contains('@') {
                    Err("Please enter a valid email address")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;

        let password: String = Password::with_theme(&theme)
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.len() < 8 {
                    Err("Password must be at least 8 characters")
                } else {
                    Ok(())
                }
            })
            .interact()?;

        let request = StoreUserRequest::new(name, email, password).context("Failed to create user request")?;

        match self.user_service.register(request).await {
            Ok(user) => {
                println!("{} Account created!", CHECKMARK);
                println!("Name: {}", style(&user.name).green());
                println!("Email: {}", style(&user.email).green());
                if user.is_admin() {
                    println!("Role: {}", style(user.role).magenta());
                }
                info!("User {} registered successfully", user.email);
            }
            Err(UserServiceError::EmailExists { email }) => {
                println!("{} Email '{}' already exists", CROSS, style(email).red());
            }
            Err(e) => {
                println!("{} Registration failed: {}", CROSS, style(&e).red());
                error!("Registration failed: {}", e);
            }
        }

        Ok(())
    }

    async fn handle_login(&self) -> Result<()> {
        println!("{} {}", GIFT, style("Login").bold().cyan());

        let theme = ColorfulTheme::default();

        let email: String = Input::with_theme(&theme).with_prompt("Email").interact_text()?;

        let password: String = Password::with_theme(&theme).with_prompt("Password").interact()?;

        match self.auth_service.login(&email, &password).await {
            Ok(response) => {
                println!("{} Login successful!", CHECKMARK);
                println!("Welcome back, {}!", style(&response.user.name).green());
                println!("Session expires: {}", style(format_date(&response.expires_at)).yellow());
                info!("User {} logged in successfully", response.user.email);

                match self.cart_service.claim_guest_cart(&response.user.id) {
                    Ok(0) => {}
                    Ok(lines) => println!("{} Moved {} products from your guest cart", INFO, lines),
                    Err(e) => warn!("Could not move guest cart: {}", e),
                }
            }
            Err(AuthServiceError::AuthenticationFailed)
            | Err(AuthServiceError::UserServiceError(UserServiceError::AuthenticationFailed))
            | Err(AuthServiceError::UserServiceError(UserServiceError::UserNotFound)) => {
                println!("{} Invalid email or password", CROSS);
                warn!("Login failed for user: {}", email);
            }
            Err(e) => {
                println!("{} Login failed: {}", CROSS, style(&e).red());
                error!("Login failed: {}", e);
            }
        }

        Ok(())
    }

    async fn handle_logout(&self) -> Result<()> {
        match self.auth_service.logout().await {
            Ok(_) => {
                println!("{} Logged out successfully", CHECKMARK);
                info!("User logged out successfully");
            }
            Err(e) => {
                println!("{} Logout failed: {}", CROSS, style(&e).red());
                error!("Logout failed: {}", e);
            }
        }

        Ok(())
    }

    async fn handle_auth_status(&self) -> Result<()> {
        match self.auth_service.get_current_session().await {
            Ok(Some(user)) => {
                println!("{} {}", INFO, style("Authentication Status").bold().cyan());
                println!("Status: {}", style("Authenticated").green());
                println!("Name: {}", style(&user.name).green());
                println!("Email: {}", style(&user.email).green());
                println!("Role: {}", style(user.role).green());
                println!("User ID: {}", style(&user.id).dim());
            }
            Ok(None) => {
                println!("{} {}", WARNING, style("Not authenticated").yellow());
                println!("Use {} to login", style("gift-shop auth login").cyan());
            }
            Err(e) => {
                println!("{} Failed to check authentication status: {}", CROSS, style(&e).red());
                error!("Failed to check auth status: {}", e);
            }
        }

        Ok(())
    }

    // Catalog Commands
    async fn handle_product_command(&self, command: ProductCommands) -> Result<()> {
        match command {
            ProductCommands::List {
                search,
                min_price,
                max_price,
                in_stock,
            } => {
                let mut filter = ProductFilter::new().with_price_range(min_price, max_price);
                if let Some(search) = search {
                    filter = filter.with_search(search);
                }
                if in_stock {
                    filter = filter.in_stock_only();
                }

                match self.catalog_service.list_products(filter).await {
                    Ok(products) if products.is_empty() => println!("{} No products found", INFO),
                    Ok(products) => {
                        println!("{} {}", INFO, style(format!("Found {} products", products.len())).bold());
                        println!("{}", format_product_table(&products));
                    }
                    Err(e) => {
                        println!("{} Failed to list products: {}", CROSS, style(&e).red());
                        error!("Failed to list products: {}", e);
                    }
                }
            }
            ProductCommands::Show { id } => {
                let product_id = Uuid::parse_str(&id).context("Invalid product ID format")?;

                match self.catalog_service.get_product(&product_id).await {
                    Ok(product) => {
                        println!("{}", format_product_detail(&product, self.image_base_url.as_deref()));
                    }
                    Err(CatalogServiceError::ProductNotFound) => {
                        println!("{} Product not found", CROSS);
                    }
                    Err(e) => {
                        println!("{} Failed to get product: {}", CROSS, style(&e).red());
                        error!("Failed to get product: {}", e);
                    }
                }
            }
        }

        Ok(())
    }

    // Cart Commands
    async fn handle_cart_command(&self, command: CartCommands) -> Result<()> {
        let owner = self
            .auth_service
            .get_current_session()
            .await
            .context("Failed to read session")?
            .map(|user| user.id);
        let mut cart = self.cart_service.load_cart(owner.as_ref()).context("Failed to load cart")?;

        let changed = match command {
            CartCommands::Show => {
                self.print_cart(&cart);
                false
            }
            CartCommands::Add { id, quantity } => {
                let product_id = Uuid::parse_str(&id).context("Invalid product ID format")?;
                match self.cart_service.add_to_cart(&mut cart, &product_id, quantity).await {
                    Ok(item) => {
                        println!(
                            "{} Added {} x {} ({} in cart)",
                            CHECKMARK,
                            quantity,
                            style(&item.name).green(),
                            item.quantity
                        );
                        println!("Cart total: {}", style(format_money(cart.total())).yellow());
                        true
                    }
                    Err(e) => {
                        report_cart_error(&e);
                        false
                    }
                }
            }
            CartCommands::Update { id, quantity } => {
                let product_id = Uuid::parse_str(&id).context("Invalid product ID format")?;
                match self.cart_service.update_quantity(&mut cart, &product_id, quantity).await {
                    Ok(item) => {
                        println!(
                            "{} {} quantity set to {}",
                            CHECKMARK,
                            style(&item.name).green(),
                            item.quantity
                        );
                        println!("Cart total: {}", style(format_money(cart.total())).yellow());
                        true
                    }
                    Err(e) => {
                        report_cart_error(&e);
                        false
                    }
                }
            }
            CartCommands::Remove { id } => {
                let product_id = Uuid::parse_str(&id).context("Invalid product ID format")?;
                match self.cart_service.remove_from_cart(&mut cart, &product_id) {
                    Ok(item) => {
                        println!("{} Removed {} from cart", CHECKMARK, style(&item.name).green());
                        true
                    }
                    Err(e) => {
                        report_cart_error(&e);
                        false
                    }
                }
            }
            CartCommands::Clear { force } => {
                if cart.is_empty() {
                    println!("{} Your cart is already empty", INFO);
                    false
                } else if force
                    || Confirm::with_theme(&ColorfulTheme::default())
                        .with_prompt(format!("Remove all {} items from the cart?", cart.item_count()))
                        .default(false)
                        .interact()?
                {
                    self.cart_service.clear_cart(&mut cart);
                    println!("{} Cart cleared", CHECKMARK);
                    true
                } else {
                    println!("{} Clear cancelled", INFO);
                    false
                }
            }
        };

        if changed {
            self.cart_service
                .save_cart(owner.as_ref(), &cart)
                .context("Failed to save cart")?;
        }

        Ok(())
    }

    fn print_cart(&self, cart: &Cart) {
        if cart.is_empty() {
            println!("{} Your cart is empty", INFO);
            println!("Browse products with {}", style("gift-shop product list").cyan());
            return;
        }

        println!("{} {}", GIFT, style("Your cart").bold().cyan());
        println!("{}", format_cart_table(cart.items()));
        print!("{}", format_cart_summary(&self.cart_service.summarize(cart)));
    }

    // Checkout
    async fn handle_checkout(&self, args: CheckoutArgs) -> Result<()> {
        let Some(user) = self.require_user().await else {
            return Ok(());
        };

        let mut cart = self.cart_service.load_cart(Some(&user.id)).context("Failed to load cart")?;
        if cart.is_empty() {
            println!("{} Your cart is empty", WARNING);
            return Ok(());
        }

        self.print_cart(&cart);
        println!();

        let theme = ColorfulTheme::default();
        let shipping_address = ShippingAddress {
            name: prompt_if_missing(&theme, args.name, "Recipient name", Some(user.name.clone()))?,
            street: prompt_if_missing(&theme, args.street, "Street address", None)?,
            city: prompt_if_missing(&theme, args.city, "City", None)?,
            state: prompt_if_missing(&theme, args.state, "State", None)?,
            zip_code: prompt_if_missing(&theme, args.zip, "PIN code", None)?,
            phone: prompt_if_missing(&theme, args.phone, "Phone", None)?,
        };

        let summary = self.cart_service.summarize(&cart);
        let confirmed = Confirm::with_theme(&theme)
            .with_prompt(format!("Place order for {}?", format_money(summary.total)))
            .default(true)
            .interact()?;
        if !confirmed {
            println!("{} Checkout cancelled", INFO);
            return Ok(());
        }

        match self.order_service.place_order(&user, &mut cart, shipping_address).await {
            Ok(order) => {
                self.cart_service
                    .save_cart(Some(&user.id), &cart)
                    .context("Failed to save cart")?;
                println!("{} Order placed!", CHECKMARK);
                println!("{}", format_order_detail(&order));
                info!("Order {} placed by {}", order.order_number, user.email);
            }
            Err(OrderServiceError::InsufficientStock { product_id }) => {
                let name = cart
                    .get(&product_id)
                    .map(|item| item.name.clone())
                    .unwrap_or_else(|| product_id.to_string());
                println!("{} Sorry, {} no longer has enough stock", CROSS, style(name).red());
            }
            Err(e) => {
                println!("{} Checkout failed: {}", CROSS, style(&e).red());
                error!("Checkout failed: {}", e);
            }
        }

        Ok(())
    }

    // Order Commands
    async fn handle_order_command(&self, command: OrderCommands) -> Result<()> {
        let Some(user) = self.require_user().await else {
            return Ok(());
        };

        match command {
            OrderCommands::List { all } => {
                let result = if all {
                    self.order_service.list_all_orders(&user).await
                } else {
                    self.order_service.list_orders(&user).await
                };

                match result {
                    Ok(orders) if orders.is_empty() => println!("{} No orders yet", INFO),
                    Ok(orders) => {
                        println!("{} {}", INFO, style(format!("Found {} orders", orders.len())).bold());
                        println!("{}", format_order_table(&orders));
                    }
                    Err(e) => {
                        println!("{} Failed to list orders: {}", CROSS, style(&e).red());
                        error!("Failed to list orders: {}", e);
                    }
                }
            }
            OrderCommands::Show { order_number } => match self.order_service.get_order(&user, &order_number).await {
                Ok(order) => println!("{}", format_order_detail(&order)),
                Err(e @ OrderServiceError::OrderNotFound { .. }) | Err(e @ OrderServiceError::AccessDenied { .. }) => {
                    println!("{} {}", CROSS, e);
                }
                Err(e) => {
                    println!("{} Failed to get order: {}", CROSS, style(&e).red());
                    error!("Failed to get order: {}", e);
                }
            },
        }

        Ok(())
    }

    // Admin Commands
    async fn handle_admin_command(&self, command: AdminCommands) -> Result<()> {
        let user = match self.auth_service.require_admin().await {
            Ok(user) => user,
            Err(AuthServiceError::AdminRequired) => {
                println!("{} Admin privileges required", CROSS);
                return Ok(());
            }
            Err(AuthServiceError::SessionNotFound) | Err(AuthServiceError::SessionExpired) => {
                println!("{} Please login first: {}", WARNING, style("gift-shop auth login").cyan());
                return Ok(());
            }
            Err(e) => {
                println!("{} Authentication error: {}", CROSS, style(e).red());
                return Ok(());
            }
        };

        match command {
            AdminCommands::Dashboard => match self.dashboard_service.get_statistics().await {
                Ok(stats) => {
                    println!("{} {}", GIFT, style("Store dashboard").bold().cyan());
                    print!("{}", format_dashboard(&stats));
                }
                Err(e) => {
                    println!("{} Failed to load dashboard: {}", CROSS, style(&e).red());
                    error!("Failed to load dashboard: {}", e);
                }
            },
            AdminCommands::AddProduct {
                name,
                price,
                cost,
                stock,
                summary,
                description,
                image,
            } => {
                let request = StoreProductRequest {
                    name,
                    short_description: summary,
                    long_description: description,
                    purchase_rate: cost,
                    sale_rate: price,
                    quantity: stock,
                    featured_image: image,
                    images: Vec::new(),
                };

                match self.catalog_service.create_product(request).await {
                    Ok(product) => {
                        println!("{} Product created!", CHECKMARK);
                        println!("ID: {}", style(&product.id).cyan());
                        println!("Name: {}", style(&product.name).green());
                        println!("Price: {}", style(format_money(product.sale_rate)).yellow());
                    }
                    Err(e) => {
                        println!("{} Failed to create product: {}", CROSS, style(&e).red());
                        error!("Failed to create product: {}", e);
                    }
                }
            }
            AdminCommands::UpdateProduct {
                id,
                name,
                price,
                cost,
                stock,
                summary,
                description,
                image,
            } => {
                let product_id = Uuid::parse_str(&id).context("Invalid product ID format")?;
                let updates = UpdateProductRequest {
                    name,
                    short_description: summary,
                    long_description: description,
                    purchase_rate: cost,
                    sale_rate: price,
                    quantity: stock,
                    featured_image: image,
                    images: None,
                };

                match self.catalog_service.update_product(&product_id, updates).await {
                    Ok(product) => {
                        println!("{} Product updated!", CHECKMARK);
                        println!("{}", format_product_detail(&product, self.image_base_url.as_deref()));
                    }
                    Err(CatalogServiceError::ProductNotFound) => println!("{} Product not found", CROSS),
                    Err(e) => {
                        println!("{} Failed to update product: {}", CROSS, style(&e).red());
                        error!("Failed to update product: {}", e);
                    }
                }
            }
            AdminCommands::DeleteProduct { id, force } => {
                let product_id = Uuid::parse_str(&id).context("Invalid product ID format")?;

                if !force {
                    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                        .with_prompt(format!("Delete product {}?", product_id))
                        .default(false)
                        .interact()?;
                    if !confirmed {
                        println!("{} Deletion cancelled", INFO);
                        return Ok(());
                    }
                }

                match self.catalog_service.delete_product(&product_id).await {
                    Ok(true) => println!("{} Product deleted", CHECKMARK),
                    Ok(false) => println!("{} Product not found", CROSS),
                    Err(e) => {
                        println!("{} Failed to delete product: {}", CROSS, style(&e).red());
                        error!("Failed to delete product: {}", e);
                    }
                }
            }
            AdminCommands::SetStatus { order_number, status } => {
                match self
                    .order_service
                    .update_status(&user, &order_number, status.into())
                    .await
                {
                    Ok(order) => println!(
                        "{} Order {} is now {}",
                        CHECKMARK,
                        style(&order.order_number).cyan(),
                        style(order.status).green()
                    ),
                    Err(e) => {
                        println!("{} Failed to update order: {}", CROSS, style(&e).red());
                        error!("Failed to update order status: {}", e);
                    }
                }
            }
        }

        Ok(())
    }
}

fn report_cart_error(err: &CartServiceError) {
    match err {
        CartServiceError::ProductNotFound | CartServiceError::NotInCart { .. } => {
            println!("{} {}", CROSS, err);
        }
        CartServiceError::InsufficientStock { .. } | CartServiceError::CartError(_) => {
            println!("{} {}", WARNING, style(err).yellow());
        }
        _ => {
            println!("{} Cart update failed: {}", CROSS, style(err).red());
            error!("Cart update failed: {}", err);
        }
    }
}

fn prompt_if_missing(
    theme: &ColorfulTheme,
    value: Option<String>,
    prompt: &str,
    default: Option<String>,
) -> Result<String> {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        return Ok(value.trim().to_string());
    }

    let mut input = Input::<String>::with_theme(theme).with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default);
    }

    Ok(input.interact_text()?.trim().to_string())
}
